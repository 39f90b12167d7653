//! Per-resource sync: pushing local content after a file change.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::api::{self, RemoteApi};
use crate::local;
use crate::models::{ResourceSnapshot, ResourceType, SyncResult, UpdateOutcome};
use crate::watcher::ChangeHandler;

/// Receiver of "content changed, reload" signals.
pub trait RefreshSink: Send + Sync {
    fn refresh(&self, route: &str);
}

/// Read access to what the live preview should display.
pub trait PreviewSource: Send + Sync {
    /// Page title (the resource id).
    fn title(&self) -> String;
    /// Current preview URL, resolved at call time.
    fn preview_url(&self) -> Option<String>;
}

/// The mutable run-time state of one resource session.
///
/// Replaced as a whole after every successful update so readers never see a
/// half-updated snapshot.
#[derive(Debug)]
pub struct ResourceState {
    snapshot: RwLock<ResourceSnapshot>,
    preview_url: RwLock<Option<String>>,
}

impl ResourceState {
    pub fn new(snapshot: ResourceSnapshot, preview_url: Option<String>) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
            preview_url: RwLock::new(preview_url),
        }
    }

    pub fn snapshot(&self) -> ResourceSnapshot {
        match self.snapshot.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn replace_snapshot(&self, snapshot: ResourceSnapshot) {
        match self.snapshot.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }

    pub fn set_preview_url(&self, url: Option<String>) {
        match self.preview_url.write() {
            Ok(mut guard) => *guard = url,
            Err(poisoned) => *poisoned.into_inner() = url,
        }
    }
}

impl PreviewSource for ResourceState {
    fn title(&self) -> String {
        self.snapshot().id
    }

    fn preview_url(&self) -> Option<String> {
        match self.preview_url.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Pushes a resource's local files to the API on every change.
pub struct ResourceSync {
    resource_type: ResourceType,
    id: String,
    dir: PathBuf,
    api: Arc<dyn RemoteApi>,
    state: Arc<ResourceState>,
    debug_preview: bool,
    refresh: Option<Arc<dyn RefreshSink>>,
}

impl ResourceSync {
    pub fn new(
        dir: &Path,
        api: Arc<dyn RemoteApi>,
        state: Arc<ResourceState>,
        debug_preview: bool,
        refresh: Option<Arc<dyn RefreshSink>>,
    ) -> Self {
        let snapshot = state.snapshot();
        Self {
            resource_type: snapshot.resource_type,
            id: snapshot.id,
            dir: dir.to_path_buf(),
            api,
            state,
            debug_preview,
            refresh,
        }
    }

    pub fn state(&self) -> &Arc<ResourceState> {
        &self.state
    }

    async fn accept(&self, snapshot: ResourceSnapshot) {
        if self.resource_type == ResourceType::Template {
            match api::preview_url(self.api.as_ref(), &snapshot, self.debug_preview).await {
                Ok(url) => self.state.set_preview_url(url),
                Err(e) => warn!(id = %self.id, "keeping previous preview URL: {}", e),
            }
        }
        self.state.replace_snapshot(snapshot);

        if let Some(refresh) = &self.refresh {
            refresh.refresh("/");
        }
    }
}

#[async_trait]
impl ChangeHandler for ResourceSync {
    #[instrument(skip(self), fields(resource = %self.resource_type, id = %self.id))]
    async fn on_change(&self, changed: &Path) -> SyncResult {
        if !self.dir.is_dir() {
            return SyncResult::failed(format!(
                "working path '{}' no longer exists",
                self.dir.display()
            ));
        }

        let payload = match local::build_payload(self.resource_type, &self.dir) {
            Ok(payload) => payload,
            Err(e) => return SyncResult::failed(e.to_string()),
        };

        debug!("pushing local content");
        match self.api.update(self.resource_type, &self.id, &payload).await {
            Ok(UpdateOutcome::Updated(snapshot)) => {
                info!(updated_at = %snapshot.updated_at, "synced");
                self.accept(snapshot).await;
                SyncResult::Synced
            }
            Ok(UpdateOutcome::Rejected(errors)) => SyncResult::failed(errors.format()),
            Err(e) => SyncResult::failed(e.to_string()),
        }
    }
}
