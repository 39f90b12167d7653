//! Static mapping between resource attributes, local files and remote fields.

use crate::errors::MapperError;
use crate::models::{ResourceType, TrackedFile};

/// Template files in resolution order.
pub const TEMPLATE_FILES: [TrackedFile; 3] = [
    TrackedFile {
        attribute: "HTML",
        filename: "body.html.liquid",
        remote_field: "body_draft",
    },
    TrackedFile {
        attribute: "CSS",
        filename: "styles.scss",
        remote_field: "scss_style_draft",
    },
    TrackedFile {
        attribute: "Sample Data",
        filename: "sample_data.json",
        remote_field: "sample_data_draft",
    },
];

pub const SNIPPET_FILES: [TrackedFile; 1] = [TrackedFile {
    attribute: "Code",
    filename: "code.liquid",
    remote_field: "code",
}];

/// Remote fields that can appear in validation errors but have no local file.
const UNTRACKED_FIELDS: [(&str, &str); 1] = [("settings_draft", "Settings")];

/// The fixed, ordered set of tracked files for a resource type.
pub fn files_for_resource_type(resource_type: ResourceType) -> &'static [TrackedFile] {
    match resource_type {
        ResourceType::Template => &TEMPLATE_FILES,
        ResourceType::Snippet => &SNIPPET_FILES,
    }
}

/// Look up the tracked file for a local file name.
pub fn tracked_file_by_name(filename: &str) -> Result<&'static TrackedFile, MapperError> {
    TEMPLATE_FILES
        .iter()
        .chain(SNIPPET_FILES.iter())
        .find(|f| f.filename == filename)
        .ok_or_else(|| MapperError::UnknownFileKind(filename.to_string()))
}

/// Human-readable attribute name for a local file name.
pub fn attribute_for_file(filename: &str) -> Result<&'static str, MapperError> {
    tracked_file_by_name(filename).map(|f| f.attribute)
}

/// Human-readable attribute name for a remote field, if known.
pub fn attribute_for_remote_field(field: &str) -> Option<&'static str> {
    TEMPLATE_FILES
        .iter()
        .chain(SNIPPET_FILES.iter())
        .find(|f| f.remote_field == field)
        .map(|f| f.attribute)
        .or_else(|| {
            UNTRACKED_FIELDS
                .iter()
                .find(|(name, _)| *name == field)
                .map(|(_, display)| *display)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_for_file() {
        assert_eq!(attribute_for_file("body.html.liquid"), Ok("HTML"));
        assert_eq!(attribute_for_file("styles.scss"), Ok("CSS"));
        assert_eq!(attribute_for_file("sample_data.json"), Ok("Sample Data"));
        assert_eq!(attribute_for_file("code.liquid"), Ok("Code"));
    }

    #[test]
    fn test_unknown_file_kind() {
        assert_eq!(
            attribute_for_file("README.md"),
            Err(MapperError::UnknownFileKind("README.md".into()))
        );
        assert!(attribute_for_file(".pdfmonkey.json").is_err());
    }

    #[test]
    fn test_files_for_resource_type_order() {
        let names: Vec<_> = files_for_resource_type(ResourceType::Template)
            .iter()
            .map(|f| f.filename)
            .collect();
        assert_eq!(names, ["body.html.liquid", "styles.scss", "sample_data.json"]);

        let snippet = files_for_resource_type(ResourceType::Snippet);
        assert_eq!(snippet.len(), 1);
        assert_eq!(snippet[0].remote_field, "code");
    }

    #[test]
    fn test_mapping_is_total_and_unique() {
        let all: Vec<_> = TEMPLATE_FILES.iter().chain(SNIPPET_FILES.iter()).collect();
        for file in &all {
            assert_eq!(tracked_file_by_name(file.filename).unwrap(), *file);
            assert_eq!(attribute_for_remote_field(file.remote_field), Some(file.attribute));
        }
        let mut filenames: Vec<_> = all.iter().map(|f| f.filename).collect();
        filenames.sort();
        filenames.dedup();
        assert_eq!(filenames.len(), all.len());
    }

    #[test]
    fn test_untracked_field_display_name() {
        assert_eq!(attribute_for_remote_field("settings_draft"), Some("Settings"));
        assert_eq!(attribute_for_remote_field("unknown"), None);
    }
}
