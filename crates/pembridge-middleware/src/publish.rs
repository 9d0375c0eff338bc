//! The publisher seam between the hub and the broker.
//!
//! The [`SessionHub`][crate::hub::SessionHub] never speaks MQTT itself.  It
//! hands fully-routed `(topic, payload)` pairs to a [`ControlPublisher`];
//! the broker crate implements the trait over its live client, tests plug in
//! a recording mock.

use async_trait::async_trait;
use pembridge_types::{BridgeError, Topic};

/// One-way publish access to the broker.
///
/// # Contract
///
/// A call maps to exactly one broker publish.  No acknowledgement is
/// awaited and no retry is attempted; a transport failure comes back as
/// [`BridgeError::Publish`] for the caller to log.
#[async_trait]
pub trait ControlPublisher: Send + Sync {
    /// Publish `payload` (serialized JSON) on `topic`.
    async fn publish(&self, topic: Topic, payload: String) -> Result<(), BridgeError>;
}
