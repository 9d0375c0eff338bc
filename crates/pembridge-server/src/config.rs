//! Configuration – reads an optional `pembridge.toml` next to the binary's
//! working directory, then applies environment overrides.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Bridge configuration.
///
/// Every field has a default, so an empty (or absent) file yields a working
/// localhost setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// MQTT broker hostname.
    #[serde(default = "default_broker_host")]
    pub broker_host: String,

    /// MQTT broker port.
    #[serde(default = "default_broker_port")]
    pub broker_port: u16,

    /// Client identifier presented to the broker.
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// HTTP/WebSocket port for the dashboard.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

fn default_broker_host() -> String {
    "localhost".to_string()
}
fn default_broker_port() -> u16 {
    1883
}
fn default_client_id() -> String {
    "pembridge".to_string()
}
fn default_http_port() -> u16 {
    pembridge_dashboard::DEFAULT_PORT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            broker_host: default_broker_host(),
            broker_port: default_broker_port(),
            client_id: default_client_id(),
            http_port: default_http_port(),
        }
    }
}

/// Return the path of the config file: `./pembridge.toml`.
pub fn config_path() -> PathBuf {
    PathBuf::from("pembridge.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

/// Load the config from a specific path.
pub(crate) fn load_from(path: &PathBuf) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply environment variable overrides to `cfg`.
///
/// Supported variables:
///
/// | Variable | Config field |
/// |---|---|
/// | `PEMBRIDGE_BROKER_HOST` | `broker_host` |
/// | `PEMBRIDGE_BROKER_PORT` | `broker_port` |
/// | `PEMBRIDGE_CLIENT_ID` | `client_id` |
/// | `PORT` | `http_port` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("PEMBRIDGE_BROKER_HOST") {
        cfg.broker_host = v;
    }
    if let Ok(v) = std::env::var("PEMBRIDGE_BROKER_PORT")
        && let Ok(port) = v.parse::<u16>()
    {
        cfg.broker_port = port;
    }
    if let Ok(v) = std::env::var("PEMBRIDGE_CLIENT_ID") {
        cfg.client_id = v;
    }
    if let Ok(v) = std::env::var("PORT")
        && let Ok(port) = v.parse::<u16>()
    {
        cfg.http_port = port;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_localhost() {
        let cfg = Config::default();
        assert_eq!(cfg.broker_host, "localhost");
        assert_eq!(cfg.broker_port, 1883);
        assert_eq!(cfg.http_port, 3000);
        assert_eq!(cfg.client_id, "pembridge");
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("pembridge.toml");
        let result = load_from(&path).expect("no error");
        assert!(result.is_none());
    }

    #[test]
    fn roundtrip_config_file() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("pembridge.toml");
        fs::write(
            &path,
            "broker_host = \"broker.lab\"\nbroker_port = 1884\nhttp_port = 8080\n",
        )
        .expect("write");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.broker_host, "broker.lab");
        assert_eq!(loaded.broker_port, 1884);
        assert_eq!(loaded.http_port, 8080);
        // Unspecified field keeps its default.
        assert_eq!(loaded.client_id, "pembridge");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("pembridge.toml");
        fs::write(&path, "client_id = \"rig-42\"\n").expect("write");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.client_id, "rig-42");
        assert_eq!(loaded.broker_port, 1883);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("pembridge.toml");
        fs::write(&path, "broker_port = \"not a port\"\n").expect("write");

        assert!(load_from(&path).is_err());
    }

    #[test]
    fn apply_env_overrides_changes_broker_host() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("PEMBRIDGE_BROKER_HOST", "broker.internal") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.broker_host, "broker.internal");
        unsafe { std::env::remove_var("PEMBRIDGE_BROKER_HOST") };
    }

    #[test]
    fn apply_env_overrides_changes_http_port() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("PORT", "8080") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.http_port, 8080);
        unsafe { std::env::remove_var("PORT") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_port() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("PEMBRIDGE_BROKER_PORT", "not-a-port") };
        let mut cfg = Config::default();
        let original = cfg.broker_port;
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.broker_port, original);
        unsafe { std::env::remove_var("PEMBRIDGE_BROKER_PORT") };
    }
}
