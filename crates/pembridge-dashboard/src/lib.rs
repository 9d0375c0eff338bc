//! `pembridge-dashboard` – the browser-facing transport shell.
//!
//! Boots a lightweight HTTP + WebSocket server (default port `3000`) that:
//!
//! 1. **Serves** the embedded single-page dashboard at every non-WebSocket
//!    HTTP path, and a liveness probe at `GET /health`.
//!
//! 2. **Bridges** the [`SessionHub`] to every connected browser tab over a
//!    persistent WebSocket, streaming `mqtt-data`, `matlab-update`,
//!    `arduino-update`, and `mpc-comparison` frames in real time.
//!
//! 3. **Accepts** upstream frames from the browser – `control-command` and
//!    `mpc-config` – and dispatches them to the hub for publication on the
//!    broker.  Anything else is silently ignored.
//!
//! [`SessionHub`]: pembridge_middleware::SessionHub

pub mod server;

pub use server::{DEFAULT_PORT, DashboardServer};
