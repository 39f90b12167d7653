//! Watch sessions: starting, composing and shutting down resource watches.
//!
//! A session covers one or more resources. Each resource goes through the
//! same start sequence: resolve its id, fetch the remote snapshot, reconcile
//! local files, start the live preview (templates only), then watch the
//! working directory. In a composed session at most one template is active
//! and snippet syncs refresh the template's preview.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::api::{self, RemoteApi};
use crate::conflict::{ConflictResolver, DiffViewer, Reconciliation};
use crate::errors::{PreviewError, SessionError, ShutdownError};
use crate::local;
use crate::metadata::{self, ResourceMetadata};
use crate::models::{ResourceSnapshot, ResourceType};
use crate::prompt::Prompter;
use crate::sync::{PreviewSource, RefreshSink, ResourceState, ResourceSync};
use crate::watcher::{FileWatcher, SyncReporter, WatchHandle};

// ---------------------------------------------------------------------------
// Shutdown
// ---------------------------------------------------------------------------

/// Something that holds OS resources and can be closed once.
pub trait Closeable: Send + Sync {
    fn name(&self) -> String;
    fn close(&self) -> Result<(), ShutdownError>;
}

impl Closeable for WatchHandle {
    fn name(&self) -> String {
        format!("watcher for {}", self.path().display())
    }

    fn close(&self) -> Result<(), ShutdownError> {
        WatchHandle::close(self);
        Ok(())
    }
}

/// Ordered shutdown hooks of a composed session.
#[derive(Default)]
pub struct ShutdownRegistry {
    hooks: Mutex<Vec<Arc<dyn Closeable>>>,
}

impl ShutdownRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, hook: Arc<dyn Closeable>) {
        match self.hooks.lock() {
            Ok(mut hooks) => hooks.push(hook),
            Err(poisoned) => poisoned.into_inner().push(hook),
        }
    }

    pub fn len(&self) -> usize {
        match self.hooks.lock() {
            Ok(hooks) => hooks.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every hook. A failing hook never prevents the others from running.
    ///
    /// Returns the number of hooks that failed.
    pub fn shutdown_all(&self) -> usize {
        let hooks: Vec<_> = match self.hooks.lock() {
            Ok(mut hooks) => hooks.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        };
        close_all(&hooks)
    }
}

fn close_all(hooks: &[Arc<dyn Closeable>]) -> usize {
    let mut failures = 0;
    for hook in hooks {
        match hook.close() {
            Ok(()) => info!(hook = %hook.name(), "closed"),
            Err(e) => {
                error!("{}", e);
                failures += 1;
            }
        }
    }
    failures
}

// ---------------------------------------------------------------------------
// Preview
// ---------------------------------------------------------------------------

/// A running live preview of a template.
pub trait Preview: Send + Sync {
    /// Ask every connected client to reload `route`.
    fn refresh(&self, route: &str);
    /// Release the preview's listeners. Must be idempotent.
    fn close(&self) -> Result<(), ShutdownError>;
    /// URL of the preview page.
    fn address(&self) -> String;
}

/// Starts live previews for templates.
#[async_trait]
pub trait PreviewLauncher: Send + Sync {
    async fn launch(&self, source: Arc<dyn PreviewSource>) -> Result<Arc<dyn Preview>, PreviewError>;
}

/// Adapts a [`Preview`] to the refresh and shutdown seams.
#[derive(Clone)]
pub struct PreviewHandle(pub Arc<dyn Preview>);

impl RefreshSink for PreviewHandle {
    fn refresh(&self, route: &str) {
        self.0.refresh(route);
    }
}

impl Closeable for PreviewHandle {
    fn name(&self) -> String {
        format!("preview server at {}", self.0.address())
    }

    fn close(&self) -> Result<(), ShutdownError> {
        self.0.close()
    }
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// How a resource watch relates to the rest of the process.
#[derive(Clone)]
pub enum CompositionMode {
    /// The only resource of the process; it owns its shutdown.
    Standalone,
    /// One of several resources; shutdown hooks go to the shared registry and
    /// successful syncs also refresh the shared template preview, if any.
    Composed {
        shutdown: Arc<ShutdownRegistry>,
        shared_preview: Option<Arc<dyn RefreshSink>>,
    },
}

/// Collaborators a resource watch needs to start.
pub struct SessionContext<'a> {
    pub api: Arc<dyn RemoteApi>,
    pub prompter: &'a dyn Prompter,
    pub diff_viewer: &'a dyn DiffViewer,
    pub reporter: Arc<dyn SyncReporter>,
    /// Preview launcher for templates; `None` disables the preview.
    pub launcher: Option<&'a dyn PreviewLauncher>,
    /// Use the HTML debug rendering instead of the PDF preview.
    pub debug_preview: bool,
}

/// Result of starting a resource watch.
pub enum StartOutcome {
    Started(ResourceWatch),
    /// The user cancelled conflict resolution.
    Aborted { filename: &'static str },
}

/// One resource being watched and synced.
pub struct ResourceWatch {
    pub resource_type: ResourceType,
    pub id: String,
    pub dir: PathBuf,
    state: Arc<ResourceState>,
    watch: Arc<WatchHandle>,
    preview: Option<PreviewHandle>,
}

impl ResourceWatch {
    /// Run the start sequence for the resource in `dir`.
    pub async fn start(
        ctx: &SessionContext<'_>,
        resource_type: ResourceType,
        dir: &Path,
        explicit_id: Option<&str>,
        mode: CompositionMode,
    ) -> Result<StartOutcome, SessionError> {
        let id = metadata::resolve_resource_id(resource_type, explicit_id, dir)?;
        info!(%resource_type, %id, path = %dir.display(), "starting sync");

        let snapshot = ctx
            .api
            .fetch(resource_type, &id)
            .await?
            .ok_or_else(|| SessionError::FetchFailed {
                resource_type: resource_type.to_string(),
                id: id.clone(),
            })?;

        let resolver = ConflictResolver::new(ctx.prompter, ctx.diff_viewer);
        if let Reconciliation::Refused { filename } = resolver.resolve_snapshot(&snapshot, dir)? {
            warn!(%id, filename, "conflict resolution refused, not watching");
            return Ok(StartOutcome::Aborted { filename });
        }

        let preview_url = match resource_type {
            ResourceType::Template => api::preview_url(ctx.api.as_ref(), &snapshot, ctx.debug_preview)
                .await
                .map_err(SessionError::PreviewUrl)?,
            ResourceType::Snippet => None,
        };
        let state = Arc::new(ResourceState::new(snapshot, preview_url));

        let preview = match (resource_type, ctx.launcher) {
            (ResourceType::Template, Some(launcher)) => {
                Some(PreviewHandle(launcher.launch(state.clone()).await?))
            }
            _ => None,
        };

        let refresh: Option<Arc<dyn RefreshSink>> = match (&preview, &mode) {
            (Some(own), _) => Some(Arc::new(own.clone()) as Arc<dyn RefreshSink>),
            (None, CompositionMode::Composed { shared_preview, .. }) => shared_preview.clone(),
            (None, CompositionMode::Standalone) => None,
        };

        let handler = Arc::new(ResourceSync::new(
            dir,
            ctx.api.clone(),
            state.clone(),
            ctx.debug_preview,
            refresh,
        ));
        let watch = match FileWatcher::watch(dir, handler, ctx.reporter.clone()) {
            Ok(watch) => Arc::new(watch),
            Err(e) => {
                if let Some(preview) = &preview {
                    let _ = Closeable::close(preview);
                }
                return Err(e.into());
            }
        };

        if let CompositionMode::Composed { shutdown, .. } = &mode {
            shutdown.register(watch.clone());
            if let Some(preview) = &preview {
                shutdown.register(Arc::new(preview.clone()));
            }
        }

        Ok(StartOutcome::Started(Self {
            resource_type,
            id,
            dir: dir.to_path_buf(),
            state,
            watch,
            preview,
        }))
    }

    pub fn state(&self) -> &Arc<ResourceState> {
        &self.state
    }

    /// Refresh sink of this resource's live preview, if it runs one.
    pub fn refresh_sink(&self) -> Option<Arc<dyn RefreshSink>> {
        self.preview
            .clone()
            .map(|p| Arc::new(p) as Arc<dyn RefreshSink>)
    }

    /// Address of the live preview page, if any.
    pub fn preview_address(&self) -> Option<String> {
        self.preview.as_ref().map(|p| p.0.address())
    }

    /// Close the watcher and the preview independently.
    ///
    /// Returns the number of hooks that failed.
    pub fn shutdown(&self) -> usize {
        let mut hooks: Vec<Arc<dyn Closeable>> = vec![self.watch.clone()];
        if let Some(preview) = &self.preview {
            hooks.push(Arc::new(preview.clone()));
        }
        close_all(&hooks)
    }
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------

/// Result of initializing a working directory.
#[derive(Debug)]
pub enum InitOutcome {
    Initialized(ResourceSnapshot),
    /// The user declined to write into a non-empty directory.
    Cancelled,
}

/// Fetch a resource and lay out its files and metadata in `dir`.
///
/// A missing directory is created. An existing non-empty one is only used
/// after confirmation.
pub async fn init_resource(
    api: &dyn RemoteApi,
    prompter: &dyn Prompter,
    resource_type: ResourceType,
    id: &str,
    dir: &Path,
) -> Result<InitOutcome, SessionError> {
    let snapshot = api
        .fetch(resource_type, id)
        .await?
        .ok_or_else(|| SessionError::FetchFailed {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        })?;

    let created = local::ensure_dir(dir)?;
    if !created && local::dir_has_entries(dir)? {
        let message = format!(
            "Directory '{}' is not empty, files may be overwritten. Continue?",
            dir.display()
        );
        if prompter.confirm(&message, false)?.answer() != Some(true) {
            info!(path = %dir.display(), "init cancelled");
            return Ok(InitOutcome::Cancelled);
        }
    }

    local::write_resource_content(&snapshot, dir)?;
    metadata::write_metadata(
        dir,
        &ResourceMetadata {
            resource_type,
            id: snapshot.id.clone(),
        },
    )?;
    info!(%resource_type, id = %snapshot.id, path = %dir.display(), "initialized");

    Ok(InitOutcome::Initialized(snapshot))
}

// ---------------------------------------------------------------------------
// Multi-resource plan
// ---------------------------------------------------------------------------

/// A resource directory accepted into a multi-resource session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedResource {
    pub dir: PathBuf,
    pub metadata: ResourceMetadata,
}

/// The resources of a multi-resource session, validated.
#[derive(Debug, Default)]
pub struct WatchPlan {
    pub template: Option<PlannedResource>,
    pub snippets: Vec<PlannedResource>,
    pub rejected: Vec<(PathBuf, SessionError)>,
}

impl WatchPlan {
    /// Load every path's metadata. Paths that are missing, not resources, or
    /// a second template are rejected; the rest are accepted.
    pub fn from_paths(paths: &[PathBuf]) -> Self {
        let mut plan = Self::default();

        for dir in paths {
            info!(path = %dir.display(), "loading path");
            let metadata = match metadata::read_metadata(dir) {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!("{}", e);
                    plan.rejected.push((dir.clone(), e.into()));
                    continue;
                }
            };

            let planned = PlannedResource {
                dir: dir.clone(),
                metadata,
            };
            match planned.metadata.resource_type {
                ResourceType::Template if plan.template.is_some() => {
                    let err = SessionError::SecondTemplate(dir.clone());
                    warn!("{}", err);
                    plan.rejected.push((dir.clone(), err));
                }
                ResourceType::Template => plan.template = Some(planned),
                ResourceType::Snippet => plan.snippets.push(planned),
            }
        }

        plan
    }

    pub fn len(&self) -> usize {
        self.snippets.len() + usize::from(self.template.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A running multi-resource session.
pub struct MultiSession {
    pub registry: Arc<ShutdownRegistry>,
    pub started: Vec<ResourceWatch>,
    /// Resources whose start sequence failed (fetch, watch, ...).
    pub failed: Vec<(PathBuf, SessionError)>,
    /// Resources whose conflict resolution the user cancelled.
    pub aborted: Vec<PathBuf>,
}

impl MultiSession {
    /// Start the template (if any) and then every snippet.
    ///
    /// A failure or refusal only affects its own resource.
    pub async fn start(ctx: &SessionContext<'_>, plan: &WatchPlan) -> Self {
        let registry = Arc::new(ShutdownRegistry::new());
        let mut session = Self {
            registry: registry.clone(),
            started: Vec::new(),
            failed: Vec::new(),
            aborted: Vec::new(),
        };

        let mut shared_preview = None;
        if let Some(template) = &plan.template {
            let mode = CompositionMode::Composed {
                shutdown: registry.clone(),
                shared_preview: None,
            };
            if let Some(watch) = session.start_one(ctx, template, mode).await {
                shared_preview = watch.refresh_sink();
                session.started.push(watch);
            }
        }

        for snippet in &plan.snippets {
            let mode = CompositionMode::Composed {
                shutdown: registry.clone(),
                shared_preview: shared_preview.clone(),
            };
            if let Some(watch) = session.start_one(ctx, snippet, mode).await {
                session.started.push(watch);
            }
        }

        info!(watching = session.started.len(), "session started");
        session
    }

    async fn start_one(
        &mut self,
        ctx: &SessionContext<'_>,
        planned: &PlannedResource,
        mode: CompositionMode,
    ) -> Option<ResourceWatch> {
        let result = ResourceWatch::start(
            ctx,
            planned.metadata.resource_type,
            &planned.dir,
            Some(&planned.metadata.id),
            mode,
        )
        .await;

        match result {
            Ok(StartOutcome::Started(watch)) => Some(watch),
            Ok(StartOutcome::Aborted { .. }) => {
                self.aborted.push(planned.dir.clone());
                None
            }
            Err(e) => {
                error!(path = %planned.dir.display(), "{}", e);
                self.failed.push((planned.dir.clone(), e));
                None
            }
        }
    }

    /// Close every watcher and the preview. Returns the number of failures.
    pub fn shutdown(&self) -> usize {
        self.registry.shutdown_all()
    }
}

