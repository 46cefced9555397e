//! Companion rendering server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, RawQuery, State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use minijinja::{context, Environment};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::CorsLayer;

use docframe_core::{render_frame, FrameOptions, FrameView, LoadError, SandboxOptions};

use crate::session::{Session, SessionStore};
use crate::watcher::FileWatcher;
use crate::websocket::{frame_client_script, ClientMessage, FrameHub, FrameMessage};

/// Path of the frame websocket endpoint.
pub const WS_PATH: &str = "/__docframe/ws";

/// Path of the frame client script.
pub const CLIENT_PATH: &str = "/__docframe/client.js";

/// Configuration for the companion server.
#[derive(Debug, Clone)]
pub struct FrameServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Directory example paths are resolved against
    pub root: PathBuf,

    /// Allow cross-origin requests from the docs site
    pub cors: bool,

    /// Execution time limit per script call
    pub timeout: Option<Duration>,

    /// Directories whose example changes reload open frames
    pub watch_paths: Vec<PathBuf>,

    /// Maximum number of live frame sessions
    pub max_sessions: usize,
}

impl Default for FrameServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5000,
            root: PathBuf::from("."),
            cors: true,
            timeout: SandboxOptions::default().timeout,
            watch_paths: Vec::new(),
            max_sessions: 64,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind to {0}: {1}")]
    BindError(String, String),

    #[error("File watch error: {0}")]
    WatchError(String),

    #[error("Template error: {0}")]
    TemplateError(#[from] minijinja::Error),
}

/// Shared server state.
struct ServerState {
    options: FrameOptions,
    sessions: SessionStore,
    reload: FrameHub,
    templates: Environment<'static>,
}

/// Companion rendering server.
pub struct FrameServer {
    config: FrameServerConfig,
}

impl FrameServer {
    /// Create a new companion server.
    pub fn new(config: FrameServerConfig) -> Self {
        Self { config }
    }

    /// Build the router without binding a socket.
    pub fn router(&self) -> Result<Router, ServerError> {
        self.router_with_hub(FrameHub::new())
    }

    fn router_with_hub(&self, reload: FrameHub) -> Result<Router, ServerError> {
        let mut templates = Environment::new();
        templates.add_template("frame.html", FRAME_TEMPLATE)?;

        let state = Arc::new(ServerState {
            options: FrameOptions {
                root: self.config.root.clone(),
                sandbox: SandboxOptions {
                    timeout: self.config.timeout,
                    ..Default::default()
                },
            },
            sessions: SessionStore::new(self.config.max_sessions),
            reload,
            templates,
        });

        let app = Router::new()
            .route(WS_PATH, get(ws_handler))
            .route(CLIENT_PATH, get(client_script_handler))
            .fallback(frame_handler)
            .with_state(state);

        if self.config.cors {
            Ok(app.layer(CorsLayer::permissive()))
        } else {
            Ok(app)
        }
    }

    /// Start the server and serve until the process exits.
    pub async fn start(self) -> Result<(), ServerError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let reload = FrameHub::new();

        if !self.config.watch_paths.is_empty() {
            let (watcher, mut rx) = FileWatcher::new(&self.config.watch_paths)
                .map_err(|e| ServerError::WatchError(e.to_string()))?;

            let hub = reload.clone();
            tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    tracing::info!("Example changed: {}", event.path().display());
                    hub.send(FrameMessage::Reload);
                }
                // Keep watcher alive
                drop(watcher);
            });
        }

        let app = self.router_with_hub(reload)?;

        let listener = tokio::net::TcpListener::bind((self.config.host.as_str(), self.config.port))
            .await
            .map_err(|e| ServerError::BindError(addr.clone(), e.to_string()))?;

        tracing::info!("Frame server listening at http://{}", addr);

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        Ok(())
    }
}

/// Render the frame named by the query string.
async fn frame_handler(
    State(state): State<Arc<ServerState>>,
    RawQuery(query): RawQuery,
) -> Response {
    let options = state.options.clone();
    let loaded = tokio::task::spawn_blocking(move || {
        let mut view = render_frame(query.as_deref(), &options)?;
        let html = view.render();
        Ok::<_, LoadError>((view, html))
    })
    .await;

    let (status, content, session) = match loaded {
        Ok(Ok((FrameView::Component(frame), html))) => {
            let (id, _) = state.sessions.insert(frame);
            (StatusCode::OK, html, Some(id))
        }
        Ok(Ok((_, html))) => (StatusCode::OK, html, None),
        Ok(Err(LoadError::NotFound(path))) => {
            tracing::error!("Example file not found: {}", path.display());
            let mut view = FrameView::Error(format!("FileNotFound: {}\n", path.display()));
            (StatusCode::NOT_FOUND, view.render(), None)
        }
        Err(err) => {
            tracing::error!("Frame task failed: {}", err);
            let mut view = FrameView::Error(format!("Frame task failed: {}\n", err));
            (StatusCode::INTERNAL_SERVER_ERROR, view.render(), None)
        }
    };

    let page = state.templates.get_template("frame.html").and_then(|tmpl| {
        tmpl.render(context! {
            content => content,
            session => session,
            client_path => CLIENT_PATH,
        })
    });

    match page {
        Ok(page) => (status, Html(page)).into_response(),
        Err(err) => {
            tracing::error!("Failed to render frame page: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct WsParams {
    session: u64,
}

/// Handler for the frame websocket endpoint.
async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<Arc<ServerState>>,
) -> Response {
    let Some(session) = state.sessions.get(params.session) else {
        return (StatusCode::NOT_FOUND, "Unknown frame session").into_response();
    };

    ws.on_upgrade(move |socket| handle_ws(socket, state, params.session, session))
}

/// Handle a websocket connection for one frame session.
async fn handle_ws(mut socket: WebSocket, state: Arc<ServerState>, id: u64, session: Arc<Session>) {
    let mut prints = session.hub().subscribe();
    let mut reloads = state.reload.subscribe();

    if !send(&mut socket, &FrameMessage::Connected).await {
        state.sessions.remove(id);
        return;
    }

    loop {
        tokio::select! {
            msg = prints.recv() => match msg {
                Ok(msg) => if !send(&mut socket, &msg).await { break },
                Err(RecvError::Lagged(skipped)) => tracing::debug!("Frame {} skipped {} prints", id, skipped),
                Err(RecvError::Closed) => break,
            },
            msg = reloads.recv() => match msg {
                Ok(msg) => if !send(&mut socket, &msg).await { break },
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let reply = handle_client_message(&session, text.as_str()).await;
                    if !send(&mut socket, &reply).await { break }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::debug!("Frame session {} closed", id);
    state.sessions.remove(id);
}

/// Dispatch a client event to the session's frame.
async fn handle_client_message(session: &Arc<Session>, text: &str) -> FrameMessage {
    let ClientMessage::Event { handler, value } = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(err) => {
            return FrameMessage::Error {
                message: format!("Invalid message: {}", err),
            }
        }
    };

    let session = Arc::clone(session);
    let result = tokio::task::spawn_blocking(move || session.frame().dispatch(handler, value)).await;

    match result {
        Ok(Ok(html)) => FrameMessage::Update { html },
        Ok(Err(err)) => FrameMessage::Error {
            message: err.to_string(),
        },
        Err(err) => FrameMessage::Error {
            message: format!("Event task failed: {}", err),
        },
    }
}

async fn send(socket: &mut WebSocket, msg: &FrameMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        Err(err) => {
            tracing::warn!("Failed to encode frame message: {}", err);
            true
        }
    }
}

/// Handler for the frame client script.
async fn client_script_handler() -> impl IntoResponse {
    let script = frame_client_script(WS_PATH);
    ([("content-type", "application/javascript")], script)
}

const FRAME_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>docframe</title>
  <style>
    body { font-family: system-ui, sans-serif; margin: 0; padding: 1rem; }
    pre.printout { background: #f5f5f5; padding: 0.75rem; border-radius: 0.375rem; overflow-x: auto; }
    pre.docframe-error { color: #b00020; white-space: pre-wrap; }
  </style>
</head>
<body>
  <div id="docframe-root"{% if session %} data-session="{{ session }}"{% endif %}>{{ content | safe }}</div>
  {% if session %}<script src="{{ client_path | safe }}"></script>{% endif %}
</body>
</html>"##;
