//! The hidden `.pdfmonkey.json` file that records which remote resource a
//! working directory belongs to.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{LocalFileError, MetadataError};
use crate::models::ResourceType;

/// Fixed name of the metadata file inside a resource directory.
pub const METADATA_FILE: &str = ".pdfmonkey.json";

/// Identity of the resource a directory is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMetadata {
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub id: String,
}

fn uuid_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)[a-z0-9]{8}(?:-[a-z0-9]{4}){4}[a-z0-9]{8}").expect("valid UUID pattern")
    })
}

/// Whether an identifier looks like a resource UUID.
pub fn looks_like_uuid(id: &str) -> bool {
    uuid_pattern().is_match(id)
}

/// Whether the directory carries a metadata file.
pub fn is_resource(dir: &Path) -> bool {
    dir.join(METADATA_FILE).is_file()
}

/// Read and validate the metadata file of a resource directory.
pub fn read_metadata(dir: &Path) -> Result<ResourceMetadata, MetadataError> {
    if !dir.exists() {
        return Err(MetadataError::PathNotFound(dir.to_path_buf()));
    }

    let path = dir.join(METADATA_FILE);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(MetadataError::NotFound(dir.to_path_buf()));
        }
        Err(e) => return Err(LocalFileError::new("read", &path, e).into()),
    };

    let metadata: ResourceMetadata =
        serde_json::from_str(&raw).map_err(|e| MetadataError::Malformed {
            path: path.clone(),
            detail: e.to_string(),
        })?;

    if metadata.id.trim().is_empty() {
        return Err(MetadataError::Malformed {
            path,
            detail: "empty id".into(),
        });
    }

    debug!(path = %dir.display(), id = %metadata.id, "read resource metadata");
    Ok(metadata)
}

/// Write the metadata file, pretty-printed.
pub fn write_metadata(dir: &Path, metadata: &ResourceMetadata) -> Result<(), MetadataError> {
    let path = dir.join(METADATA_FILE);
    let json = serde_json::to_string_pretty(metadata).map_err(|e| MetadataError::Malformed {
        path: path.clone(),
        detail: e.to_string(),
    })?;
    fs::write(&path, json).map_err(|e| LocalFileError::new("write", &path, e))?;
    info!(path = %path.display(), id = %metadata.id, "wrote resource metadata");
    Ok(())
}

/// Work out which remote resource a directory should sync with.
///
/// An existing metadata file always wins. Otherwise the explicit id is used,
/// falling back to the directory name; a UUID-looking id is persisted so
/// later runs recover it without flags.
pub fn resolve_resource_id(
    resource_type: ResourceType,
    explicit_id: Option<&str>,
    dir: &Path,
) -> Result<String, MetadataError> {
    if is_resource(dir) {
        return Ok(read_metadata(dir)?.id);
    }

    let id = match explicit_id {
        Some(id) => id.to_string(),
        None => dir
            .canonicalize()
            .unwrap_or_else(|_| dir.to_path_buf())
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| MetadataError::PathNotFound(dir.to_path_buf()))?,
    };

    if looks_like_uuid(&id) && dir.is_dir() {
        write_metadata(
            dir,
            &ResourceMetadata {
                resource_type,
                id: id.clone(),
            },
        )?;
    }

    Ok(id)
}

/// Resource directories one or two levels below `root`, sorted.
pub fn discover_resources(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();

    for entry in subdirectories(root) {
        if is_resource(&entry) {
            found.push(entry.clone());
        }
        for nested in subdirectories(&entry) {
            if is_resource(&nested) {
                found.push(nested);
            }
        }
    }

    found.sort();
    found
}

fn subdirectories(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect()
        })
        .unwrap_or_default()
}
