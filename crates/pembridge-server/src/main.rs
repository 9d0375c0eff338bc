//! `pembridge` – MQTT ⇄ WebSocket bridge for the PEM test rig.
//!
//! Boot sequence:
//!
//! 1. Initialise structured logging (and optional OTLP export).
//! 2. Load `pembridge.toml` (environment variables override; defaults
//!    target a localhost broker and port 3000).
//! 3. Connect the broker client, wire its publisher into the session hub,
//!    and spawn the broker event loop.
//! 4. Run the dashboard HTTP/WebSocket server until Ctrl-C.

mod config;
mod telemetry;

use std::sync::Arc;

use tracing::{error, info, warn};

use pembridge_broker::BrokerClient;
use pembridge_dashboard::DashboardServer;
use pembridge_middleware::SessionHub;

use crate::config::Config;

#[tokio::main]
async fn main() {
    let _guard = telemetry::init_tracing("pembridge");

    let cfg = load_config();
    info!(
        broker = %format!("{}:{}", cfg.broker_host, cfg.broker_port),
        http_port = cfg.http_port,
        "starting PEM bridge"
    );

    let broker = BrokerClient::connect(&cfg.broker_host, cfg.broker_port, &cfg.client_id);
    let hub = Arc::new(SessionHub::new(Arc::new(broker.publisher())));

    tokio::spawn(broker.run(Arc::clone(&hub)));

    let server = DashboardServer::new(Arc::clone(&hub)).with_port(cfg.http_port);

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!(error = %e, "dashboard server failed");
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received; shutting down");
        }
    }
}

/// Load the configuration, falling back to (env-overridden) defaults when
/// the file is absent or unreadable.
fn load_config() -> Config {
    match config::load() {
        Ok(Some(cfg)) => {
            info!(path = %config::config_path().display(), "config loaded");
            cfg
        }
        Ok(None) => {
            let mut cfg = Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
        Err(e) => {
            warn!(error = %e, "config error; using defaults");
            let mut cfg = Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    }
}
