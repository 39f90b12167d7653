//! Reconciling remote resource content with the local working directory.
//!
//! The conflict subsystem is responsible for:
//! 1. **Detection** -- comparing remote and local content of each tracked file.
//! 2. **Resolution** -- asking the user which side to keep and applying it.
//! 3. **Diffing** -- showing what changed between both sides on request.

pub mod diff;
pub mod resolver;

pub use diff::{DiffViewer, ExternalDiffViewer, InlineDiffViewer};
pub use resolver::{ConflictResolver, FileResolution, Reconciliation};
