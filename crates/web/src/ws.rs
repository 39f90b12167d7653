//! Live-reload endpoint.
//!
//! The preview page loads `/livereload.js`, which opens a WebSocket to
//! `/livereload`. Every refresh is broadcast to all connected clients as
//! `{"command":"reload","path":<route>}`.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Shared state of the live-reload server.
pub struct LiveReloadState {
    pub events: broadcast::Sender<String>,
    /// Port the live-reload server listens on, baked into the client script.
    pub port: u16,
}

pub fn routes() -> Router<Arc<LiveReloadState>> {
    Router::new()
        .route("/livereload.js", get(client_script))
        .route("/livereload", get(ws_handler))
}

/// The JSON message asking clients to reload `route`.
pub fn reload_message(route: &str) -> String {
    serde_json::json!({ "command": "reload", "path": route }).to_string()
}

/// Client script: connect, reload on command, reconnect when dropped.
pub fn client_script_source(port: u16) -> String {
    format!(
        r#"(function () {{
  var url = "ws://" + (location.hostname || "localhost") + ":{port}/livereload";
  function connect() {{
    var socket = new WebSocket(url);
    socket.onmessage = function (event) {{
      var message = JSON.parse(event.data);
      if (message.command === "reload") {{
        window.location.reload();
      }}
    }};
    socket.onclose = function () {{
      setTimeout(connect, 1000);
    }};
  }}
  connect();
}})();
"#
    )
}

async fn client_script(State(state): State<Arc<LiveReloadState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        client_script_source(state.port),
    )
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<LiveReloadState>>) -> impl IntoResponse {
    let rx = state.events.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, rx))
}

async fn handle_socket(mut socket: WebSocket, mut rx: broadcast::Receiver<String>) {
    debug!("live-reload client connected");

    // Forward reload messages until the client goes away or the preview closes.
    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(msg) => {
                        if let Err(e) = socket.send(Message::Text(msg)).await {
                            debug!("live-reload send error (client disconnected?): {}", e);
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Missed reloads collapse into one.
                        warn!("live-reload client lagged by {} messages", n);
                        if socket.send(Message::Text(reload_message("/"))).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("reload channel closed, disconnecting client");
                        break;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("live-reload client disconnected");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = socket.send(Message::Pong(data)).await {
                            debug!("live-reload pong error: {}", e);
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!("live-reload receive error: {}", e);
                        break;
                    }
                }
            }
        }
    }

    debug!("live-reload connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[test]
    fn test_reload_message_shape() {
        let msg: serde_json::Value = serde_json::from_str(&reload_message("/")).unwrap();
        assert_eq!(msg["command"], "reload");
        assert_eq!(msg["path"], "/");
    }

    #[tokio::test]
    async fn test_client_script_points_at_own_port() {
        let (events, _) = broadcast::channel(8);
        let app = routes().with_state(Arc::new(LiveReloadState { events, port: 4321 }));

        let resp = app
            .oneshot(Request::get("/livereload.js").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/javascript");

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let script = String::from_utf8(body.to_vec()).unwrap();
        assert!(script.contains(":4321/livereload"));
    }
}
