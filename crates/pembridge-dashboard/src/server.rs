//! [`DashboardServer`] – HTTP + WebSocket server for the PEM dashboard.
//!
//! Listens on `0.0.0.0:3000` (configurable via [`DashboardServer::with_port`]).
//!
//! * `GET /health` → liveness JSON.
//! * Other HTTP requests → 200 OK with the embedded dashboard HTML.
//! * WebSocket upgrades → one registered session on the [`SessionHub`].

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};

use pembridge_middleware::SessionHub;
use pembridge_types::BridgeError;

/// Default TCP port for the dashboard HTTP/WebSocket server.
pub const DEFAULT_PORT: u16 = 3000;

/// The compiled-in dashboard single-page application (HTML + CSS + JS).
const DASHBOARD_HTML: &str = include_str!("dashboard.html");

// ---------------------------------------------------------------------------
// DashboardServer
// ---------------------------------------------------------------------------

/// Lightweight HTTP + WebSocket server that serves the dashboard UI and
/// bridges the [`SessionHub`] to every connected browser.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use pembridge_middleware::SessionHub;
/// use pembridge_dashboard::DashboardServer;
///
/// # async fn run(hub: Arc<SessionHub>) {
/// DashboardServer::new(hub)
///     .run()
///     .await
///     .expect("dashboard server failed");
/// # }
/// ```
pub struct DashboardServer {
    hub: Arc<SessionHub>,
    port: u16,
}

impl DashboardServer {
    /// Create a server backed by `hub` on the [`DEFAULT_PORT`].
    pub fn new(hub: Arc<SessionHub>) -> Self {
        Self {
            hub,
            port: DEFAULT_PORT,
        }
    }

    /// Override the listening port (builder-style).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Return the configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Start the server.
    ///
    /// Accepts TCP connections and dispatches each one as either a WebSocket
    /// session (when the HTTP request carries `Upgrade: websocket`) or a
    /// plain HTTP response.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Transport`] if the TCP listener cannot bind.
    pub async fn run(self) -> Result<(), BridgeError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| BridgeError::Transport(format!("bind error on {addr}: {e}")))?;

        info!(port = self.port, "PEM dashboard listening");

        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let hub = Arc::clone(&self.hub);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, peer, hub).await {
                            error!(peer = %peer, error = %e, "client error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "accept error");
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Per-connection handler
// ---------------------------------------------------------------------------

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    hub: Arc<SessionHub>,
) -> Result<(), BridgeError> {
    // Peek at the first bytes of the request to decide whether to upgrade to
    // WebSocket or answer plain HTTP.  `peek` does not consume the data, so
    // tungstenite's handshaker sees the full HTTP request.
    let mut buf = [0u8; 1024];
    let n = stream
        .peek(&mut buf)
        .await
        .map_err(|e| BridgeError::Transport(format!("peek error from {peer}: {e}")))?;

    let header_preview = String::from_utf8_lossy(&buf[..n]).into_owned();
    let is_ws_upgrade = header_preview.lines().any(|line| {
        line.to_lowercase().starts_with("upgrade:") && line.to_lowercase().contains("websocket")
    });

    if is_ws_upgrade {
        handle_ws(stream, peer, hub).await
    } else {
        serve_http(stream, &header_preview).await
    }
}

// ---------------------------------------------------------------------------
// Plain HTTP: health probe + embedded dashboard
// ---------------------------------------------------------------------------

async fn serve_http(mut stream: TcpStream, header_preview: &str) -> Result<(), BridgeError> {
    let path = request_path(header_preview);

    let (content_type, body) = if path == "/health" {
        ("application/json", health_body())
    } else {
        ("text/html; charset=utf-8", DASHBOARD_HTML.to_string())
    };

    let response = format!(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: {}\r\n\
         Content-Length: {}\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        content_type,
        body.len(),
        body
    );
    stream
        .write_all(response.as_bytes())
        .await
        .map_err(|e| BridgeError::Transport(format!("HTTP write error: {e}")))?;
    Ok(())
}

/// Extract the request path from the first line of an HTTP request.
fn request_path(header_preview: &str) -> &str {
    header_preview
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
}

/// Liveness probe body: `{"status":"healthy","timestamp":"<RFC 3339>"}`.
pub(crate) fn health_body() -> String {
    json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    })
    .to_string()
}

// ---------------------------------------------------------------------------
// WebSocket: one hub session per connection
// ---------------------------------------------------------------------------

async fn handle_ws(
    stream: TcpStream,
    peer: SocketAddr,
    hub: Arc<SessionHub>,
) -> Result<(), BridgeError> {
    let ws_stream = accept_async(stream)
        .await
        .map_err(|e| BridgeError::Transport(format!("WS handshake from {peer}: {e}")))?;

    let (mut ws_tx, mut ws_rx) = ws_stream.split();
    let mut session = hub.register();
    let session_id = session.id;

    loop {
        tokio::select! {
            // ── Downstream: hub → browser ──────────────────────────────────
            result = session.events.recv() => {
                match result {
                    Ok(event) => {
                        match serde_json::to_string(&event) {
                            Ok(frame) => {
                                if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(error = %e, "event serialization error");
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(session = %session_id, lagged_by = n, "session lagged; events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            // ── Upstream: browser → hub ────────────────────────────────────
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_frame(text.as_str(), &hub).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    hub.deregister(session);
    Ok(())
}

// ---------------------------------------------------------------------------
// Upstream frame dispatch
// ---------------------------------------------------------------------------

/// Parse an incoming WebSocket text frame from the browser and dispatch it
/// to the hub.
///
/// Recognised frames:
///
/// | `event` | Effect |
/// |---|---|
/// | `control-command` | Routed by `destination` and published on a control topic |
/// | `mpc-config` | Wrapped as `mpc_config` and published on the MATLAB control topic |
///
/// Unknown events and invalid JSON are silently ignored; publish failures
/// only reach the server log.
pub(crate) async fn handle_client_frame(text: &str, hub: &Arc<SessionHub>) {
    let Ok(frame) = serde_json::from_str::<Value>(text) else {
        return;
    };

    let event = frame.get("event").and_then(|e| e.as_str()).unwrap_or("");
    let data = frame.get("data").cloned().unwrap_or(Value::Null);

    match event {
        "control-command" => {
            if let Err(e) = hub.on_control_command(data).await {
                warn!(error = %e, "control command publish failed");
            }
        }
        "mpc-config" => {
            if let Err(e) = hub.on_mpc_config(data).await {
                warn!(error = %e, "MPC config publish failed");
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
