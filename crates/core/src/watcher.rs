//! File watcher and sync loop.
//!
//! A [`FileWatcher`] observes a working directory and turns every relevant
//! file-system event into one call of a [`ChangeHandler`]. Attempts run
//! concurrently: a slow remote call never holds back the next event. Each
//! attempt is reported through a [`SyncReporter`] and a failed attempt never
//! stops the loop.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::conflict::diff::REMOTE_COPY_PREFIX;
use crate::errors::WatchError;
use crate::metadata::METADATA_FILE;
use crate::models::SyncResult;

/// Something that happened under a watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A file or directory was created, modified, renamed or removed.
    Changed(PathBuf),
    /// The OS watcher reported an error (e.g. the directory disappeared).
    Error(String),
}

/// Reacts to one change by syncing the resource.
#[async_trait]
pub trait ChangeHandler: Send + Sync {
    async fn on_change(&self, changed: &Path) -> SyncResult;
}

/// Visual feedback for sync attempts.
pub trait SyncReporter: Send + Sync {
    /// Start the indicator for one attempt.
    fn begin(&self, label: &str) -> Box<dyn AttemptProgress>;
}

/// Indicator of one in-flight attempt, resolved exactly once.
pub trait AttemptProgress: Send {
    fn finish(self: Box<Self>, result: &SyncResult);
}

/// Reporter that writes attempts to the tracing log.
#[derive(Debug, Default, Clone)]
pub struct LogReporter;

struct LogAttempt {
    label: String,
}

impl SyncReporter for LogReporter {
    fn begin(&self, label: &str) -> Box<dyn AttemptProgress> {
        info!("{}", label);
        Box::new(LogAttempt {
            label: label.to_string(),
        })
    }
}

impl AttemptProgress for LogAttempt {
    fn finish(self: Box<Self>, result: &SyncResult) {
        match result {
            SyncResult::Synced => info!("{} - synced!", self.label),
            SyncResult::Failed { errors } => warn!("{} - failed:\n{}", self.label, errors),
        }
    }
}

/// Whether an event path carries resource content worth syncing.
pub fn is_relevant_path(path: &Path) -> bool {
    match path.file_name().map(|n| n.to_string_lossy()) {
        Some(name) => name != METADATA_FILE && !name.starts_with(REMOTE_COPY_PREFIX),
        None => true,
    }
}

/// Label shown for an attempt triggered by `path`.
pub fn attempt_label(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    format!("Updated: {}", name)
}

fn translate(event: notify::Result<notify::Event>) -> Option<WatchEvent> {
    match event {
        Ok(event) => {
            if matches!(event.kind, EventKind::Access(_)) {
                return None;
            }
            event
                .paths
                .into_iter()
                .find(|p| is_relevant_path(p))
                .map(WatchEvent::Changed)
        }
        Err(e) => Some(WatchEvent::Error(e.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Watcher
// ---------------------------------------------------------------------------

/// Entry point for watching directories.
pub struct FileWatcher;

impl FileWatcher {
    /// Watch `path` recursively and drive `handler` for every change.
    pub fn watch(
        path: &Path,
        handler: Arc<dyn ChangeHandler>,
        reporter: Arc<dyn SyncReporter>,
    ) -> Result<WatchHandle, WatchError> {
        if !path.exists() {
            return Err(WatchError::PathNotFound(path.to_path_buf()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            if let Some(event) = translate(res) {
                let _ = tx.send(event);
            }
        })?;
        watcher.watch(path, RecursiveMode::Recursive)?;
        info!(path = %path.display(), "watching for changes");

        let task = spawn_loop(rx, handler, reporter);
        Ok(WatchHandle::new(path, Some(watcher), task))
    }

    /// Drive `handler` from an already existing event stream.
    ///
    /// No OS resources are held; closing the handle stops the loop.
    pub fn from_events(
        path: &Path,
        events: mpsc::UnboundedReceiver<WatchEvent>,
        handler: Arc<dyn ChangeHandler>,
        reporter: Arc<dyn SyncReporter>,
    ) -> WatchHandle {
        let task = spawn_loop(events, handler, reporter);
        WatchHandle::new(path, None, task)
    }
}

fn spawn_loop(
    mut events: mpsc::UnboundedReceiver<WatchEvent>,
    handler: Arc<dyn ChangeHandler>,
    reporter: Arc<dyn SyncReporter>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut attempts = JoinSet::new();

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    let handler = handler.clone();
                    let reporter = reporter.clone();
                    attempts.spawn(run_attempt(event, handler, reporter));
                }
                Some(joined) = attempts.join_next(), if !attempts.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            warn!("sync attempt panicked: {}", e);
                        }
                    }
                }
            }
        }

        // Event source closed: let in-flight attempts finish.
        while attempts.join_next().await.is_some() {}
        debug!("watch loop ended");
    })
}

async fn run_attempt(event: WatchEvent, handler: Arc<dyn ChangeHandler>, reporter: Arc<dyn SyncReporter>) {
    match event {
        WatchEvent::Changed(path) => {
            let progress = reporter.begin(&attempt_label(&path));
            let result = handler.on_change(&path).await;
            progress.finish(&result);
        }
        WatchEvent::Error(detail) => {
            let progress = reporter.begin("Watch error");
            progress.finish(&SyncResult::failed(format!("file watcher error: {}", detail)));
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

struct WatchInner {
    watcher: Option<RecommendedWatcher>,
    task: JoinHandle<()>,
}

/// A running watch. Closing it stops observation and releases OS resources.
pub struct WatchHandle {
    path: PathBuf,
    inner: Mutex<Option<WatchInner>>,
}

impl WatchHandle {
    fn new(path: &Path, watcher: Option<RecommendedWatcher>, task: JoinHandle<()>) -> Self {
        Self {
            path: path.to_path_buf(),
            inner: Mutex::new(Some(WatchInner { watcher, task })),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop watching. Returns `false` when the handle was already closed.
    pub fn close(&self) -> bool {
        let inner = match self.inner.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        match inner {
            Some(WatchInner { watcher, task }) => {
                drop(watcher);
                task.abort();
                info!(path = %self.path.display(), "stopped watching");
                true
            }
            None => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        match self.inner.lock() {
            Ok(guard) => guard.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }
}
