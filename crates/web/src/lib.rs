//! Live preview servers for PDFMonkey templates.
//!
//! A [`PreviewCoordinator`] runs two Axum servers:
//! - the page server, which frames the template's current preview URL
//! - the live-reload server, which serves the reload client script and
//!   pushes reload commands over a WebSocket
//!
//! The coordinator goes `Idle -> Serving -> Closed`. Closing is idempotent.

pub mod page;
pub mod ws;

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use pdfmonkey_core::errors::{PreviewError, ShutdownError};
use pdfmonkey_core::session::{Preview, PreviewLauncher};
use pdfmonkey_core::sync::{PreviewSource, RefreshSink};

pub const DEFAULT_PORT: u16 = 2081;
pub const DEFAULT_LIVERELOAD_PORT: u16 = 2082;

/// Ports of the two preview servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewConfig {
    pub port: u16,
    pub livereload_port: u16,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            livereload_port: DEFAULT_LIVERELOAD_PORT,
        }
    }
}

struct Server {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Server {
    fn spawn(listener: TcpListener, app: Router, what: &'static str) -> Self {
        let (shutdown, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await;
            if let Err(e) = result {
                warn!("{} stopped with error: {}", what, e);
            }
        });
        Self { shutdown, task }
    }

    fn stop(self) {
        let _ = self.shutdown.send(());
        self.task.abort();
    }
}

enum Lifecycle {
    Idle,
    Serving {
        page: Server,
        livereload: Server,
        addrs: (SocketAddr, SocketAddr),
    },
    Closed,
}

/// The page and live-reload servers of one template.
pub struct PreviewCoordinator {
    config: PreviewConfig,
    source: Arc<dyn PreviewSource>,
    events: broadcast::Sender<String>,
    state: Mutex<Lifecycle>,
}

async fn bind(what: &'static str, port: u16) -> Result<TcpListener, PreviewError> {
    TcpListener::bind((Ipv4Addr::LOCALHOST, port))
        .await
        .map_err(|source| PreviewError::Bind { what, port, source })
}

impl PreviewCoordinator {
    pub fn new(config: PreviewConfig, source: Arc<dyn PreviewSource>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            config,
            source,
            events,
            state: Mutex::new(Lifecycle::Idle),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Lifecycle> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Bind both listeners and start serving.
    ///
    /// Both ports are bound before this returns; on failure nothing keeps
    /// running. Starting a coordinator that is not idle does nothing.
    pub async fn start(&self) -> Result<(), PreviewError> {
        if !matches!(*self.lock(), Lifecycle::Idle) {
            warn!("preview already started or closed");
            return Ok(());
        }

        let livereload_listener = bind("live-reload server", self.config.livereload_port).await?;
        let page_listener = bind("preview server", self.config.port).await?;
        let livereload_addr = livereload_listener
            .local_addr()
            .map_err(|source| PreviewError::Bind {
                what: "live-reload server",
                port: self.config.livereload_port,
                source,
            })?;
        let page_addr = page_listener.local_addr().map_err(|source| PreviewError::Bind {
            what: "preview server",
            port: self.config.port,
            source,
        })?;

        let livereload_app = ws::routes()
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::new(ws::LiveReloadState {
                events: self.events.clone(),
                port: livereload_addr.port(),
            }));
        let page_app = page::routes()
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::new(page::PageState {
                source: self.source.clone(),
                livereload_port: livereload_addr.port(),
            }));

        let mut state = self.lock();
        if !matches!(*state, Lifecycle::Idle) {
            // Closed while binding.
            return Ok(());
        }
        *state = Lifecycle::Serving {
            livereload: Server::spawn(livereload_listener, livereload_app, "live-reload server"),
            page: Server::spawn(page_listener, page_app, "preview server"),
            addrs: (page_addr, livereload_addr),
        };

        info!("Preview server running on http://localhost:{}", page_addr.port());
        info!("LiveReload server running on http://localhost:{}", livereload_addr.port());
        Ok(())
    }

    /// Bound addresses of the page and live-reload servers while serving.
    pub fn local_addrs(&self) -> Option<(SocketAddr, SocketAddr)> {
        match &*self.lock() {
            Lifecycle::Serving { addrs, .. } => Some(*addrs),
            _ => None,
        }
    }

    pub fn is_serving(&self) -> bool {
        matches!(*self.lock(), Lifecycle::Serving { .. })
    }

    /// Tell every connected client to reload `route`.
    pub fn refresh(&self, route: &str) {
        if !self.is_serving() {
            debug!("preview not serving, ignoring refresh");
            return;
        }
        // No connected clients is not an error.
        let _ = self.events.send(ws::reload_message(route));
        debug!(route, "refresh sent");
    }

    /// Stop both servers. Returns `false` when already closed.
    pub fn close(&self) -> bool {
        let previous = std::mem::replace(&mut *self.lock(), Lifecycle::Closed);
        match previous {
            Lifecycle::Serving {
                page, livereload, ..
            } => {
                page.stop();
                livereload.stop();
                info!("preview servers stopped");
                true
            }
            Lifecycle::Idle => true,
            Lifecycle::Closed => false,
        }
    }

    /// URL of the preview page.
    pub fn address(&self) -> String {
        let port = self
            .local_addrs()
            .map(|(page, _)| page.port())
            .unwrap_or(self.config.port);
        format!("http://localhost:{}", port)
    }
}

impl RefreshSink for PreviewCoordinator {
    fn refresh(&self, route: &str) {
        PreviewCoordinator::refresh(self, route);
    }
}

impl Preview for PreviewCoordinator {
    fn refresh(&self, route: &str) {
        PreviewCoordinator::refresh(self, route);
    }

    fn close(&self) -> Result<(), ShutdownError> {
        PreviewCoordinator::close(self);
        Ok(())
    }

    fn address(&self) -> String {
        PreviewCoordinator::address(self)
    }
}

/// Launches a [`PreviewCoordinator`] per template.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreviewServer {
    pub config: PreviewConfig,
}

impl PreviewServer {
    pub fn new(config: PreviewConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PreviewLauncher for PreviewServer {
    async fn launch(&self, source: Arc<dyn PreviewSource>) -> Result<Arc<dyn Preview>, PreviewError> {
        let coordinator = Arc::new(PreviewCoordinator::new(self.config, source));
        coordinator.start().await?;
        Ok(coordinator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct StaticSource;

    impl PreviewSource for StaticSource {
        fn title(&self) -> String {
            "tpl-1".to_string()
        }

        fn preview_url(&self) -> Option<String> {
            Some("https://preview.example/tpl-1".to_string())
        }
    }

    fn ephemeral() -> PreviewCoordinator {
        PreviewCoordinator::new(
            PreviewConfig {
                port: 0,
                livereload_port: 0,
            },
            Arc::new(StaticSource),
        )
    }

    #[tokio::test]
    async fn test_start_serves_page_and_script() {
        let preview = ephemeral();
        preview.start().await.unwrap();
        let (page, livereload) = preview.local_addrs().unwrap();

        let html = reqwest::get(format!("http://{}/", page))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(html.contains("<title>tpl-1</title>"));
        assert!(html.contains(&format!("http://localhost:{}/livereload.js", livereload.port())));

        let script = reqwest::get(format!("http://{}/livereload.js", livereload))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(script.contains("WebSocket"));

        assert!(preview.close());
    }

    #[tokio::test]
    async fn test_refresh_broadcasts_reload() {
        let preview = ephemeral();
        let mut rx = preview.events.subscribe();

        // Not serving yet: dropped.
        preview.refresh("/");
        assert!(rx.try_recv().is_err());

        preview.start().await.unwrap();
        preview.refresh("/");
        let msg = rx.recv().await.unwrap();
        assert_eq!(msg, r#"{"command":"reload","path":"/"}"#);

        preview.close();
        preview.refresh("/");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_releases_ports() {
        let preview = ephemeral();
        preview.start().await.unwrap();
        let (page, _) = preview.local_addrs().unwrap();

        assert!(preview.close());
        assert!(!preview.close());
        assert!(!preview.is_serving());

        let mut released = false;
        for _ in 0..50 {
            if tokio::net::TcpStream::connect(page).await.is_err() {
                released = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(released);

        // Closed coordinators never restart.
        preview.start().await.unwrap();
        assert!(!preview.is_serving());
    }

    #[tokio::test]
    async fn test_port_in_use_is_bind_error() {
        let taken = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let port = taken.local_addr().unwrap().port();
        let preview = PreviewCoordinator::new(
            PreviewConfig {
                port,
                livereload_port: 0,
            },
            Arc::new(StaticSource),
        );

        let err = preview.start().await.unwrap_err();
        assert!(matches!(err, PreviewError::Bind { port: p, .. } if p == port));
        assert!(!preview.is_serving());
    }

    #[tokio::test]
    async fn test_launcher_starts_coordinator() {
        let launcher = PreviewServer::new(PreviewConfig {
            port: 0,
            livereload_port: 0,
        });
        let preview = launcher.launch(Arc::new(StaticSource)).await.unwrap();
        assert!(preview.address().starts_with("http://localhost:"));
        assert!(preview.close().is_ok());
        assert!(preview.close().is_ok());
    }
}
