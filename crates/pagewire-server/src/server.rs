//! Development server implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use tower_http::services::ServeDir;

use pagewire_static::{BuildConfig, StaticBuilder};

use crate::watcher::{FileWatcher, WatchEvent};
use crate::websocket::{reload_client_script, ReloadHub, ReloadMessage};

/// WebSocket endpoint for live reload.
pub const RELOAD_PATH: &str = "/__reload";

/// Script served to pages for live reload.
pub const RELOAD_SCRIPT_PATH: &str = "/__reload.js";

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Build settings used for every rebuild
    pub build: BuildConfig,

    /// Port to listen on
    pub port: u16,

    /// Host to bind to
    pub host: String,

    /// Open browser on start
    pub open: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            build: BuildConfig {
                mode: "development".to_string(),
                ..Default::default()
            },
            port: 5173,
            host: "127.0.0.1".to_string(),
            open: true,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid address {0}")]
    InvalidAddress(String),

    #[error("Failed to bind to {0}: {1}")]
    BindError(SocketAddr, String),

    #[error("File watch error: {0}")]
    WatchError(String),
}

/// Shared server state.
struct ServerState {
    hub: ReloadHub,
}

/// Development server.
pub struct DevServer {
    config: DevServerConfig,
}

impl DevServer {
    /// Create a new development server.
    pub fn new(config: DevServerConfig) -> Self {
        Self { config }
    }

    /// Build configuration with the live reload script injected.
    pub fn build_config(&self) -> BuildConfig {
        let mut build = self.config.build.clone();
        if !build.inject_scripts.iter().any(|s| s == RELOAD_SCRIPT_PATH) {
            build.inject_scripts.push(RELOAD_SCRIPT_PATH.to_string());
        }
        build
    }

    /// Start the development server.
    pub async fn start(self) -> Result<(), ServerError> {
        let raw_addr = format!("{}:{}", self.config.host, self.config.port);
        let addr: SocketAddr = raw_addr
            .parse()
            .map_err(|_| ServerError::InvalidAddress(raw_addr.clone()))?;

        let build = self.build_config();
        let builder = Arc::new(StaticBuilder::new(build.clone()));
        let state = Arc::new(ServerState {
            hub: ReloadHub::new(),
        });

        rebuild(&builder, &state.hub).await;

        // Set up file watcher
        let mut watch_paths = vec![build.root.clone()];
        watch_paths.extend(build.public_dir.clone());
        let partial_dirs = build
            .partial_dirs
            .iter()
            .map(|d| build.root.join(d))
            .collect();

        let (watcher, mut rx) = FileWatcher::new(&watch_paths, partial_dirs)
            .map_err(|e| ServerError::WatchError(e.to_string()))?;

        // Spawn file watch handler
        let state_clone = Arc::clone(&state);
        let builder_clone = Arc::clone(&builder);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                handle_watch_event(&builder_clone, &state_clone, event).await;
            }
            // Keep watcher alive
            drop(watcher);
        });

        let app = Router::new()
            .route(RELOAD_PATH, get(ws_handler))
            .route(RELOAD_SCRIPT_PATH, get(reload_script_handler))
            .fallback_service(ServeDir::new(&builder.config().output_dir))
            .with_state(state);

        tracing::info!("Starting dev server at http://{}", addr);

        // Open browser if configured
        if self.config.open {
            let url = format!("http://{}", addr);
            let _ = open::that(&url);
        }

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        Ok(())
    }
}

/// Rebuild the site and tell clients about the outcome.
async fn rebuild(builder: &StaticBuilder, hub: &ReloadHub) {
    match builder.build().await {
        Ok(result) => {
            tracing::info!(
                "Rebuilt {} pages in {}ms",
                result.pages,
                result.duration_ms
            );
            tracing::debug!("Reloading {} clients", hub.subscriber_count());
            hub.send(ReloadMessage::Reload);
        }
        Err(e) => {
            tracing::error!("Build failed: {}", e);
            hub.send(ReloadMessage::BuildFailed {
                message: e.to_string(),
            });
        }
    }
}

/// Handle file watch events.
async fn handle_watch_event(builder: &StaticBuilder, state: &ServerState, event: WatchEvent) {
    match &event {
        WatchEvent::PageModified(path) => {
            tracing::info!("Page modified: {}", path.display());
        }
        WatchEvent::PartialModified(path) => {
            tracing::info!("Partial modified: {}", path.display());
        }
        WatchEvent::AssetModified(_) | WatchEvent::Created(_) | WatchEvent::Deleted(_) => {
            tracing::debug!("Changed: {}", event.path().display());
        }
    }

    // Every change can affect page metadata or shared output, so rebuild fully.
    rebuild(builder, &state.hub).await;
}

/// Handler for the live reload WebSocket endpoint.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Handle a WebSocket connection.
async fn handle_ws(mut socket: WebSocket, state: Arc<ServerState>) {
    let mut rx = state.hub.subscribe();

    if send_message(&mut socket, &ReloadMessage::Connected)
        .await
        .is_err()
    {
        return;
    }

    // Forward reload messages to the client
    while let Ok(msg) = rx.recv().await {
        if send_message(&mut socket, &msg).await.is_err() {
            break;
        }
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ReloadMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    socket.send(Message::Text(json.into())).await
}

/// Handler for the live reload client script.
async fn reload_script_handler() -> impl IntoResponse {
    let script = reload_client_script(RELOAD_PATH);
    ([("content-type", "application/javascript")], script)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_server_with_default_config() {
        let server = DevServer::new(DevServerConfig::default());
        assert_eq!(server.config.port, 5173);
        assert_eq!(server.config.build.mode, "development");
    }

    #[test]
    fn injects_reload_script_once() {
        let mut config = DevServerConfig::default();
        config.build.inject_scripts = vec![RELOAD_SCRIPT_PATH.to_string()];

        let build = DevServer::new(config).build_config();

        assert_eq!(build.inject_scripts, vec![RELOAD_SCRIPT_PATH.to_string()]);
    }

    #[tokio::test]
    async fn failed_rebuild_is_broadcast() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("index.html"), "{% include \"missing\" %}").unwrap();

        let builder = StaticBuilder::new(BuildConfig {
            root: src,
            output_dir: temp.path().join("dist"),
            public_dir: None,
            env_dir: temp.path().to_path_buf(),
            ..Default::default()
        });
        let hub = ReloadHub::new();
        let mut rx = hub.subscribe();

        rebuild(&builder, &hub).await;

        match rx.try_recv() {
            Ok(ReloadMessage::BuildFailed { message }) => {
                assert!(message.contains("index.html"));
            }
            other => panic!("Expected BuildFailed, got {:?}", other),
        }
    }
}
