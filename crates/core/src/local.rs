//! Reading and writing tracked files in a resource working directory.
//!
//! Local state is always read fresh from disk; nothing here caches content
//! between sync cycles.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::errors::LocalFileError;
use crate::mapper;
use crate::models::{ResourceSnapshot, ResourceType, UpdatePayload};

/// Read a file from the working directory.
///
/// Returns `Ok(None)` when the file does not exist. Any other failure
/// (permissions, invalid UTF-8, a directory in the way) is an error.
pub fn read_local(dir: &Path, filename: &str) -> Result<Option<String>, LocalFileError> {
    let path = dir.join(filename);
    match fs::read_to_string(&path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(LocalFileError::new("read", path, e)),
    }
}

/// Last modification time of a file, or `None` if it does not exist.
pub fn local_updated_at(dir: &Path, filename: &str) -> Result<Option<DateTime<Local>>, LocalFileError> {
    let path = dir.join(filename);
    match fs::metadata(&path) {
        Ok(meta) => {
            let modified = meta
                .modified()
                .map_err(|e| LocalFileError::new("stat", &path, e))?;
            Ok(Some(DateTime::<Local>::from(modified)))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(LocalFileError::new("stat", path, e)),
    }
}

/// Write a file into the working directory. Absent content writes an empty file.
pub fn write_local(dir: &Path, filename: &str, content: Option<&str>) -> Result<(), LocalFileError> {
    let path = dir.join(filename);
    fs::write(&path, content.unwrap_or_default()).map_err(|e| LocalFileError::new("write", &path, e))?;
    debug!(path = %path.display(), "wrote local file");
    Ok(())
}

/// Read every tracked file of a resource and package it as an update payload.
///
/// A missing file contributes an empty string, never a dropped field.
pub fn build_payload(resource_type: ResourceType, dir: &Path) -> Result<UpdatePayload, LocalFileError> {
    let mut payload = UpdatePayload::default();
    for file in mapper::files_for_resource_type(resource_type) {
        let content = read_local(dir, file.filename)?.unwrap_or_default();
        payload.0.insert(file.remote_field, content);
    }
    Ok(payload)
}

/// Write every tracked file of a snapshot into the working directory.
pub fn write_resource_content(snapshot: &ResourceSnapshot, dir: &Path) -> Result<(), LocalFileError> {
    for file in mapper::files_for_resource_type(snapshot.resource_type) {
        info!(attribute = file.attribute, "writing {} content", snapshot.resource_type);
        write_local(dir, file.filename, snapshot.content(file))?;
    }
    Ok(())
}

/// Create the directory (and parents) if it does not exist yet.
///
/// Returns `true` when the directory was created.
pub fn ensure_dir(dir: &Path) -> Result<bool, LocalFileError> {
    if dir.exists() {
        return Ok(false);
    }
    fs::create_dir_all(dir).map_err(|e| LocalFileError::new("create directory", dir, e))?;
    info!(path = %dir.display(), "created directory");
    Ok(true)
}

/// Whether the directory contains any entry at all.
pub fn dir_has_entries(dir: &Path) -> Result<bool, LocalFileError> {
    let mut entries = fs::read_dir(dir).map_err(|e| LocalFileError::new("list", dir, e))?;
    Ok(entries.next().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_read_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_local(dir.path(), "code.liquid").unwrap(), None);
        assert_eq!(local_updated_at(dir.path(), "code.liquid").unwrap(), None);
    }

    #[test]
    fn test_unreadable_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        // A directory where a file is expected cannot be read as text.
        fs::create_dir(dir.path().join("code.liquid")).unwrap();
        let err = read_local(dir.path(), "code.liquid").unwrap_err();
        assert_eq!(err.action, "read");
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        write_local(dir.path(), "styles.scss", Some("body {}")).unwrap();
        assert_eq!(read_local(dir.path(), "styles.scss").unwrap().as_deref(), Some("body {}"));

        write_local(dir.path(), "styles.scss", None).unwrap();
        assert_eq!(read_local(dir.path(), "styles.scss").unwrap().as_deref(), Some(""));
        assert!(local_updated_at(dir.path(), "styles.scss").unwrap().is_some());
    }

    #[test]
    fn test_build_payload_covers_every_field() {
        let dir = TempDir::new().unwrap();
        write_local(dir.path(), "body.html.liquid", Some("<p>x</p>")).unwrap();

        let payload = build_payload(ResourceType::Template, dir.path()).unwrap();
        assert_eq!(payload.0.len(), 3);
        assert_eq!(payload.0["body_draft"], "<p>x</p>");
        assert_eq!(payload.0["scss_style_draft"], "");
        assert_eq!(payload.0["sample_data_draft"], "");

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["body_draft"], "<p>x</p>");
    }

    #[test]
    fn test_write_resource_content() {
        let dir = TempDir::new().unwrap();
        let mut fields = BTreeMap::new();
        fields.insert("code", Some("{{ name }}".to_string()));
        let snapshot = ResourceSnapshot {
            resource_type: ResourceType::Snippet,
            id: "s1".into(),
            updated_at: Utc::now(),
            fields,
            preview_url: None,
            display_name: None,
        };

        write_resource_content(&snapshot, dir.path()).unwrap();
        assert_eq!(
            read_local(dir.path(), "code.liquid").unwrap().as_deref(),
            Some("{{ name }}")
        );
    }

    #[test]
    fn test_ensure_dir_and_entries() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b");
        assert!(ensure_dir(&nested).unwrap());
        assert!(!ensure_dir(&nested).unwrap());
        assert!(!dir_has_entries(&nested).unwrap());
        write_local(&nested, "code.liquid", Some("x")).unwrap();
        assert!(dir_has_entries(&nested).unwrap());
    }
}
