//! Error types for the PDFMonkey sync core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Mapper(#[from] MapperError),

    #[error(transparent)]
    Local(#[from] LocalFileError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Preview(#[from] PreviewError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

// ---------------------------------------------------------------------------
// Mapper errors
// ---------------------------------------------------------------------------

/// Errors from the file/field mapping table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapperError {
    /// The file name is not one of the tracked resource files.
    #[error("unknown file kind: {0}")]
    UnknownFileKind(String),

    /// The resource type string is neither `template` nor `snippet`.
    #[error("unknown resource type: {0}")]
    UnknownResourceType(String),
}

// ---------------------------------------------------------------------------
// Local file errors
// ---------------------------------------------------------------------------

/// Errors reading or writing tracked files in a working directory.
#[derive(Debug, Error)]
#[error("failed to {action} '{}': {source}", path.display())]
pub struct LocalFileError {
    pub action: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl LocalFileError {
    pub fn new(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            action,
            path: path.into(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Metadata errors
// ---------------------------------------------------------------------------

/// Errors from the hidden per-resource metadata file.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The working directory does not exist.
    #[error("path '{}' does not exist", .0.display())]
    PathNotFound(PathBuf),

    /// The directory has no metadata file.
    #[error("no PDFMonkey metadata found in '{}'", .0.display())]
    NotFound(PathBuf),

    /// The metadata file is not valid JSON or lacks `type` / `id`.
    #[error("malformed metadata in '{}': {detail}", path.display())]
    Malformed { path: PathBuf, detail: String },

    /// Reading or writing the metadata file failed.
    #[error("metadata I/O error: {0}")]
    Io(#[from] LocalFileError),
}

// ---------------------------------------------------------------------------
// Remote API errors
// ---------------------------------------------------------------------------

/// Errors from the PDFMonkey REST API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP-level transport error (network, TLS, etc.).
    #[error("PDFMonkey HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered without a usable body.
    #[error("PDFMonkey API error (HTTP {status}): {body}")]
    Status { status: u16, body: String },

    /// The API answered with a body we could not interpret.
    #[error("PDFMonkey response parse error: {0}")]
    Parse(String),
}

// ---------------------------------------------------------------------------
// Conflict errors
// ---------------------------------------------------------------------------

/// Errors from the conflict resolution subsystem.
#[derive(Debug, Error)]
pub enum ConflictError {
    /// The file is not one of the resource's tracked files.
    #[error(transparent)]
    Mapper(#[from] MapperError),

    /// The local file exists but could not be read or written.
    #[error(transparent)]
    Local(#[from] LocalFileError),

    /// The prompt capability failed (not a cancellation).
    #[error("prompt failed: {0}")]
    Prompt(#[from] PromptError),
}

/// Errors surfaced by a [`crate::prompt::Prompter`] implementation.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

// ---------------------------------------------------------------------------
// Watch errors
// ---------------------------------------------------------------------------

/// Errors from the file watcher.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The path to watch does not exist.
    #[error("cannot watch '{}': path does not exist", .0.display())]
    PathNotFound(PathBuf),

    /// The OS-level watcher reported a failure.
    #[error("file watcher error: {0}")]
    Notify(#[from] notify::Error),
}

// ---------------------------------------------------------------------------
// Preview errors
// ---------------------------------------------------------------------------

/// Errors from the live preview servers.
#[derive(Debug, Error)]
pub enum PreviewError {
    /// A listener could not be bound.
    #[error("failed to bind {what} on port {port}: {source}")]
    Bind {
        what: &'static str,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Shutting down a preview listener failed.
    #[error("preview shutdown failed: {0}")]
    Shutdown(String),
}

// ---------------------------------------------------------------------------
// Session errors
// ---------------------------------------------------------------------------

/// Errors that stop a resource session from starting or running.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The remote resource could not be fetched; nothing to reconcile against.
    #[error("could not fetch {resource_type} '{id}'")]
    FetchFailed { resource_type: String, id: String },

    /// A second template was added to a session that already has one.
    #[error("only one template can be watched at a time, skipping '{}'", .0.display())]
    SecondTemplate(PathBuf),

    /// Resolving the preview URL failed.
    #[error("could not resolve preview URL: {0}")]
    PreviewUrl(#[source] ApiError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Local(#[from] LocalFileError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error("prompt failed: {0}")]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Preview(#[from] PreviewError),
}

/// Error returned by a shutdown hook.
#[derive(Debug, Error)]
#[error("failed to close {name}: {detail}")]
pub struct ShutdownError {
    pub name: String,
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = MapperError::UnknownFileKind("notes.txt".into());
        assert_eq!(err.to_string(), "unknown file kind: notes.txt");

        let err = SessionError::FetchFailed {
            resource_type: "template".into(),
            id: "abc".into(),
        };
        assert_eq!(err.to_string(), "could not fetch template 'abc'");

        let err = LocalFileError::new(
            "read",
            "/tmp/tpl/body.html.liquid",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(err.to_string().starts_with("failed to read '/tmp/tpl/body.html.liquid'"));

        let err = MetadataError::NotFound(PathBuf::from("/tmp/x"));
        assert!(err.to_string().contains("/tmp/x"));
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let core_err: CoreError = MapperError::UnknownFileKind("x".into()).into();
        assert!(matches!(core_err, CoreError::Mapper(_)));

        let core_err: CoreError = SessionError::SecondTemplate(PathBuf::from("/a")).into();
        assert!(matches!(core_err, CoreError::Session(_)));
    }
}
