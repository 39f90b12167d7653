//! Interactive conflict resolution between remote and local content.
//!
//! The [`ConflictResolver`] compares each tracked file of a freshly fetched
//! snapshot with what is on disk. Identical content passes silently; anything
//! else asks the user to keep the remote or the local version, optionally
//! after looking at a diff.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{error, info, warn};

use crate::conflict::diff::DiffViewer;
use crate::errors::ConflictError;
use crate::local;
use crate::mapper;
use crate::models::{ConflictDecision, ResourceSnapshot};
use crate::prompt::{Prompted, Prompter};

/// Outcome of reconciling a single tracked file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileResolution {
    /// Both sides were identical; nothing was asked.
    NoConflict,
    /// The local file was overwritten with the remote content.
    KeptRemote,
    /// The local file was left as-is; it will be pushed on the next sync.
    KeptLocal,
    /// The user cancelled the prompt.
    Refused,
}

impl FileResolution {
    pub fn is_refusal(&self) -> bool {
        matches!(self, Self::Refused)
    }
}

/// Outcome of reconciling every tracked file of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    Reconciled,
    /// Resolution stopped at this file; later files were not examined.
    Refused { filename: &'static str },
}

const CHOICES: [&str; 3] = ["Remote content", "Local content", "See what changed"];

/// Resolves divergences between a remote snapshot and the working directory.
pub struct ConflictResolver<'a> {
    prompter: &'a dyn Prompter,
    diff_viewer: &'a dyn DiffViewer,
}

impl<'a> ConflictResolver<'a> {
    pub fn new(prompter: &'a dyn Prompter, diff_viewer: &'a dyn DiffViewer) -> Self {
        Self {
            prompter,
            diff_viewer,
        }
    }

    /// Reconcile one tracked file.
    ///
    /// Absent content on either side counts as the empty string. A file that
    /// exists but cannot be read is an error, not an empty file.
    pub fn resolve_file(
        &self,
        remote: Option<&str>,
        remote_updated_at: DateTime<Utc>,
        dir: &Path,
        filename: &str,
    ) -> Result<FileResolution, ConflictError> {
        let attribute = mapper::attribute_for_file(filename)?;
        let local = local::read_local(dir, filename)?;
        let remote = remote.unwrap_or_default();

        if remote == local.as_deref().unwrap_or_default() {
            return Ok(FileResolution::NoConflict);
        }

        let local_updated_at = local::local_updated_at(dir, filename)?
            .map(|t| t.format("%Y-%m-%d %H:%M:%S %:z").to_string())
            .unwrap_or_else(|| "never (file missing)".to_string());
        let remote_updated_at = remote_updated_at.to_rfc3339_opts(SecondsFormat::Millis, true);

        warn!(attribute, %remote_updated_at, %local_updated_at, "conflict detected");
        let message = format!(
            "Conflict detected for {}\n  Remote content updated at {}\n  Local content updated at {}\nWhat content do you want to keep?",
            attribute, remote_updated_at, local_updated_at
        );

        loop {
            let decision = match self.prompter.select(&message, &CHOICES)? {
                Prompted::Cancelled => ConflictDecision::Cancel,
                Prompted::Answer(0) => ConflictDecision::KeepRemote,
                Prompted::Answer(1) => ConflictDecision::KeepLocal,
                Prompted::Answer(_) => {
                    if let Err(e) = self.diff_viewer.show(dir, filename, remote) {
                        error!(attribute, "error displaying the diff: {}", e);
                    }
                    continue;
                }
            };

            return self.apply(decision, remote, dir, filename, attribute);
        }
    }

    fn apply(
        &self,
        decision: ConflictDecision,
        remote: &str,
        dir: &Path,
        filename: &str,
        attribute: &str,
    ) -> Result<FileResolution, ConflictError> {
        match decision {
            ConflictDecision::KeepRemote => {
                local::write_local(dir, filename, Some(remote))?;
                info!(attribute, "using remote content");
                Ok(FileResolution::KeptRemote)
            }
            ConflictDecision::KeepLocal => {
                info!(attribute, "using local content");
                Ok(FileResolution::KeptLocal)
            }
            ConflictDecision::Cancel => {
                info!(attribute, "conflict resolution cancelled");
                Ok(FileResolution::Refused)
            }
        }
    }

    /// Reconcile every tracked file of a snapshot in the fixed mapper order.
    ///
    /// The first refusal stops the sequence; remaining files are not read.
    pub fn resolve_snapshot(
        &self,
        snapshot: &ResourceSnapshot,
        dir: &Path,
    ) -> Result<Reconciliation, ConflictError> {
        for file in mapper::files_for_resource_type(snapshot.resource_type) {
            let resolution =
                self.resolve_file(snapshot.content(file), snapshot.updated_at, dir, file.filename)?;
            if resolution.is_refusal() {
                return Ok(Reconciliation::Refused {
                    filename: file.filename,
                });
            }
        }
        Ok(Reconciliation::Reconciled)
    }
}
