//! PDFMonkey sync core library.
//!
//! This crate provides the foundational components for editing PDFMonkey
//! resources locally: the file/field mapping table, local state I/O, the
//! metadata file, the remote API client, conflict resolution, the file
//! watcher and sync loop, and multi-resource session orchestration.

pub mod api;
pub mod conflict;
pub mod errors;
pub mod local;
pub mod mapper;
pub mod metadata;
pub mod models;
pub mod prompt;
pub mod session;
pub mod sync;
pub mod watcher;

// Re-exports for convenience.
pub use api::{PdfMonkeyClient, RemoteApi};
pub use conflict::ConflictResolver;
pub use models::{ResourceSnapshot, ResourceType, SyncResult, TrackedFile};
pub use prompt::Prompter;
pub use session::{CompositionMode, ResourceWatch, ShutdownRegistry, WatchPlan};
pub use watcher::{FileWatcher, WatchHandle};
