use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The fixed set of MQTT topics the bridge speaks.
///
/// Topics are defined at compile time and never created dynamically.  Each
/// variant is bound to one exact broker topic string; [`Topic::from_name`]
/// is the registry lookup used when a broker message arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    /// Telemetry produced by the MATLAB simulation (`pem/matlab/data`).
    MatlabData,
    /// Control commands consumed by the MATLAB simulation (`pem/matlab/control`).
    MatlabControl,
    /// Telemetry produced by the Arduino rig (`pem/arduino/data`).
    ArduinoData,
    /// Control commands consumed by the Arduino rig (`pem/arduino/control`).
    ArduinoControl,
    /// MPC-vs-baseline comparison frames (`pem/mpc/comparison`).
    MpcComparison,
}

impl Topic {
    /// Every topic the broker client subscribes to at connection time.
    pub const ALL: [Topic; 5] = [
        Topic::MatlabData,
        Topic::MatlabControl,
        Topic::ArduinoData,
        Topic::ArduinoControl,
        Topic::MpcComparison,
    ];

    /// The exact broker topic string for this variant.
    pub fn name(&self) -> &'static str {
        match self {
            Topic::MatlabData => "pem/matlab/data",
            Topic::MatlabControl => "pem/matlab/control",
            Topic::ArduinoData => "pem/arduino/data",
            Topic::ArduinoControl => "pem/arduino/control",
            Topic::MpcComparison => "pem/mpc/comparison",
        }
    }

    /// Registry lookup: resolve a broker topic string to its variant.
    ///
    /// Returns `None` for any string outside the fixed set.
    pub fn from_name(name: &str) -> Option<Topic> {
        Topic::ALL.into_iter().find(|t| t.name() == name)
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Event names carried on the browser-facing WebSocket channel.
///
/// Serialized as the exact kebab-case strings the dashboard listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventName {
    /// Generic envelope emitted for every inbound broker message.
    MqttData,
    /// Specialized feed for MATLAB topics.
    MatlabUpdate,
    /// Specialized feed for Arduino topics.
    ArduinoUpdate,
    /// Specialized feed for the MPC comparison topic.
    MpcComparison,
}

impl EventName {
    /// The wire string for this event, e.g. `"mqtt-data"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::MqttData => "mqtt-data",
            EventName::MatlabUpdate => "matlab-update",
            EventName::ArduinoUpdate => "arduino-update",
            EventName::MpcComparison => "mpc-comparison",
        }
    }
}

/// One server→client WebSocket frame: an event name plus an untyped JSON
/// payload.  The bridge never validates payload schemas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserEvent {
    pub event: EventName,
    pub data: Value,
}

impl BrowserEvent {
    pub fn new(event: EventName, data: Value) -> Self {
        Self { event, data }
    }
}

/// Error taxonomy for the bridge.
///
/// `Decode` is the only locally-recovered kind: the offending message is
/// logged and dropped.  The transport kinds are returned to callers so the
/// failure reaches the logs instead of vanishing inside the client library.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("malformed JSON on '{topic}': {detail}")]
    Decode { topic: String, detail: String },

    #[error("broker connection error: {0}")]
    Connect(String),

    #[error("broker publish error: {0}")]
    Publish(String),

    #[error("transport error: {0}")]
    Transport(String),
}
