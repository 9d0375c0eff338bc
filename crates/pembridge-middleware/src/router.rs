//! Pure translation between broker topics and browser events.
//!
//! Nothing in here touches a socket: every function maps an input document to
//! an output document (or an error) and leaves delivery to the caller.
//!
//! # Inbound routing
//!
//! Every decodable broker message produces one generic [`EventName::MqttData`]
//! envelope, plus any specialized events whose table entry matches the topic:
//!
//! | Topics | Specialized event |
//! |---|---|
//! | `pem/matlab/data`, `pem/matlab/control` | `matlab-update` |
//! | `pem/arduino/data`, `pem/arduino/control` | `arduino-update` |
//! | `pem/mpc/comparison` | `mpc-comparison` |
//!
//! Table entries are checked independently, so a single topic can in
//! principle feed several specialized events; with the current fixed topic
//! set each one matches at most once.

use pembridge_types::{BridgeError, BrowserEvent, EventName, Topic};
use serde_json::{Value, json};

fn is_matlab(topic: Topic) -> bool {
    matches!(topic, Topic::MatlabData | Topic::MatlabControl)
}

fn is_arduino(topic: Topic) -> bool {
    matches!(topic, Topic::ArduinoData | Topic::ArduinoControl)
}

fn is_mpc_comparison(topic: Topic) -> bool {
    matches!(topic, Topic::MpcComparison)
}

/// Specialized routing table: each entry is tested against every inbound
/// topic on its own.
const SPECIALIZED_ROUTES: [(fn(Topic) -> bool, EventName); 3] = [
    (is_matlab, EventName::MatlabUpdate),
    (is_arduino, EventName::ArduinoUpdate),
    (is_mpc_comparison, EventName::MpcComparison),
];

/// Translate one inbound broker message into the browser events it fans out
/// as.
///
/// `raw` must be a JSON document.  On parse failure no events are produced
/// and the caller receives [`BridgeError::Decode`] to log; the message is
/// simply dropped.
///
/// A topic outside the fixed registry still yields the generic `mqtt-data`
/// envelope (the broker client only subscribes to registered topics, so this
/// is a belt-and-braces path, not a feature).
pub fn route_inbound(topic: &str, raw: &[u8]) -> Result<Vec<BrowserEvent>, BridgeError> {
    let data: Value = serde_json::from_slice(raw).map_err(|e| BridgeError::Decode {
        topic: topic.to_string(),
        detail: e.to_string(),
    })?;

    let mut events = vec![BrowserEvent::new(
        EventName::MqttData,
        json!({ "topic": topic, "data": data.clone() }),
    )];

    if let Some(known) = Topic::from_name(topic) {
        for (matches_topic, event) in SPECIALIZED_ROUTES {
            if matches_topic(known) {
                events.push(BrowserEvent::new(event, data.clone()));
            }
        }
    }

    Ok(events)
}

/// Select the control topic for a browser command and serialize the payload
/// unchanged.
///
/// `destination: "matlab"` targets the MATLAB control topic.  Any other
/// value – including a missing field – falls back to the Arduino control
/// topic.  This fallback is long-standing dispatch behavior the deployed
/// MATLAB and Arduino clients rely on; see DESIGN.md before changing it.
pub fn route_control_command(command: &Value) -> (Topic, String) {
    let topic = match command.get("destination").and_then(|d| d.as_str()) {
        Some("matlab") => Topic::MatlabControl,
        _ => Topic::ArduinoControl,
    };
    (topic, command.to_string())
}

/// Wrap an MPC configuration document and target the MATLAB control topic.
///
/// The MATLAB side discriminates control traffic on the `type` field, so the
/// raw config is enveloped as `{"type": "mpc_config", "config": …}`.
pub fn route_mpc_config(config: &Value) -> (Topic, String) {
    let envelope = json!({
        "type": "mpc_config",
        "config": config,
    });
    (Topic::MatlabControl, envelope.to_string())
}
