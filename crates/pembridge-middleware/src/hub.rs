//! [`SessionHub`] – the set of live browser sessions.
//!
//! Fan-out uses a [`tokio::sync::broadcast`] channel: every registered
//! session holds a receiver, so each broker event reaches every session
//! without any one of them blocking the others.  A session is simply present
//! (receiver alive) or absent (receiver dropped); there are no intermediate
//! states.
//!
//! Fan-in goes the other way: a session's `control-command` / `mpc-config`
//! frames are routed and handed to the [`ControlPublisher`] for exactly one
//! broker publish each.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use pembridge_types::{BridgeError, BrowserEvent};

use crate::publish::ControlPublisher;
use crate::router;

/// Default fan-out channel capacity (buffered events per slow session before
/// the oldest are dropped).
const DEFAULT_CAPACITY: usize = 256;

/// Registry of connected browser sessions plus the publish path back to the
/// broker.  Cheap to share via `Arc`; all clones of a handle feed the same
/// channel.
pub struct SessionHub {
    events: broadcast::Sender<BrowserEvent>,
    publisher: Arc<dyn ControlPublisher>,
}

/// One live browser session: a fan-out receiver tagged with an id used only
/// for logging.  Dropping the handle (or passing it to
/// [`SessionHub::deregister`]) removes the session from fan-out.
pub struct SessionHandle {
    pub id: Uuid,
    pub events: broadcast::Receiver<BrowserEvent>,
}

impl SessionHub {
    /// Create a hub with the [`DEFAULT_CAPACITY`] fan-out buffer.
    pub fn new(publisher: Arc<dyn ControlPublisher>) -> Self {
        Self::with_capacity(publisher, DEFAULT_CAPACITY)
    }

    /// Create a hub with an explicit fan-out buffer capacity.
    pub fn with_capacity(publisher: Arc<dyn ControlPublisher>, capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self { events, publisher }
    }

    /// Register a newly connected session.
    pub fn register(&self) -> SessionHandle {
        let id = Uuid::new_v4();
        let events = self.events.subscribe();
        info!(session = %id, active = self.session_count(), "web client connected");
        SessionHandle { id, events }
    }

    /// Deregister a session that has disconnected.
    pub fn deregister(&self, session: SessionHandle) {
        let id = session.id;
        drop(session);
        info!(session = %id, active = self.session_count(), "web client disconnected");
    }

    /// Number of currently registered sessions.
    pub fn session_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Deliver `event` to every registered session, at most once each.
    ///
    /// Returns the number of sessions reached.  Zero sessions is a normal
    /// no-op, not an error; sessions that disconnected mid-flight are
    /// silently skipped.
    pub fn broadcast(&self, event: BrowserEvent) -> usize {
        self.events.send(event).unwrap_or(0)
    }

    /// Route a browser control command and publish it to the broker.
    pub async fn on_control_command(&self, command: Value) -> Result<(), BridgeError> {
        let (topic, payload) = router::route_control_command(&command);
        debug!(topic = %topic, "forwarding control command to broker");
        self.publisher.publish(topic, payload).await
    }

    /// Wrap a browser MPC configuration and publish it to the broker.
    pub async fn on_mpc_config(&self, config: Value) -> Result<(), BridgeError> {
        let (topic, payload) = router::route_mpc_config(&config);
        debug!(topic = %topic, "forwarding MPC configuration to broker");
        self.publisher.publish(topic, payload).await
    }
}

impl std::fmt::Debug for SessionHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHub")
            .field("sessions", &self.session_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pembridge_types::{EventName, Topic};
    use serde_json::json;
    use tokio::sync::Mutex;

    /// Records every publish; optionally fails them all.
    struct RecordingPublisher {
        published: Mutex<Vec<(Topic, String)>>,
        fail: bool,
    }

    impl RecordingPublisher {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                published: Mutex::new(Vec::new()),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                published: Mutex::new(Vec::new()),
                fail: true,
            })
        }
    }

    #[async_trait]
    impl ControlPublisher for RecordingPublisher {
        async fn publish(&self, topic: Topic, payload: String) -> Result<(), BridgeError> {
            if self.fail {
                return Err(BridgeError::Publish("broker gone".to_string()));
            }
            self.published.lock().await.push((topic, payload));
            Ok(())
        }
    }

    fn make_hub() -> (Arc<RecordingPublisher>, SessionHub) {
        let publisher = RecordingPublisher::new();
        let hub = SessionHub::new(publisher.clone());
        (publisher, hub)
    }

    #[test]
    fn broadcast_with_zero_sessions_is_a_noop() {
        let (_, hub) = make_hub();
        let reached = hub.broadcast(BrowserEvent::new(EventName::MqttData, json!({})));
        assert_eq!(reached, 0);
    }

    #[tokio::test]
    async fn every_registered_session_receives_each_broadcast_once() {
        let (_, hub) = make_hub();
        let mut first = hub.register();
        let mut second = hub.register();

        let event = BrowserEvent::new(EventName::MatlabUpdate, json!({"v": 48.2}));
        let reached = hub.broadcast(event);
        assert_eq!(reached, 2);

        let got1 = first.events.recv().await.unwrap();
        let got2 = second.events.recv().await.unwrap();
        assert_eq!(got1.event, EventName::MatlabUpdate);
        assert_eq!(got2.data, json!({"v": 48.2}));
        // At most once: nothing further is queued.
        assert!(first.events.try_recv().is_err());
        assert!(second.events.try_recv().is_err());
    }

    #[test]
    fn register_and_deregister_track_the_session_count() {
        let (_, hub) = make_hub();
        assert_eq!(hub.session_count(), 0);

        let a = hub.register();
        let b = hub.register();
        assert_eq!(hub.session_count(), 2);

        hub.deregister(a);
        assert_eq!(hub.session_count(), 1);
        hub.deregister(b);
        assert_eq!(hub.session_count(), 0);
    }

    #[tokio::test]
    async fn dropped_session_is_silently_skipped_on_broadcast() {
        let (_, hub) = make_hub();
        let mut live = hub.register();
        let gone = hub.register();
        drop(gone.events);

        let reached = hub.broadcast(BrowserEvent::new(EventName::MqttData, json!({"n": 1})));
        assert_eq!(reached, 1);
        assert!(live.events.recv().await.is_ok());
    }

    #[tokio::test]
    async fn control_command_publishes_to_matlab_control() {
        let (publisher, hub) = make_hub();

        hub.on_control_command(json!({"destination": "matlab", "setpoint": 2.0}))
            .await
            .unwrap();

        let published = publisher.published.lock().await;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, Topic::MatlabControl);
        let payload: Value = serde_json::from_str(&published[0].1).unwrap();
        assert_eq!(payload["setpoint"], json!(2.0));
    }

    #[tokio::test]
    async fn control_command_without_destination_publishes_to_arduino_control() {
        let (publisher, hub) = make_hub();

        hub.on_control_command(json!({"relay": true})).await.unwrap();

        let published = publisher.published.lock().await;
        assert_eq!(published[0].0, Topic::ArduinoControl);
    }

    #[tokio::test]
    async fn mpc_config_publishes_the_wrapped_envelope() {
        let (publisher, hub) = make_hub();

        hub.on_mpc_config(json!({"kp": 1, "horizon": 20})).await.unwrap();

        let published = publisher.published.lock().await;
        assert_eq!(published[0].0, Topic::MatlabControl);
        let payload: Value = serde_json::from_str(&published[0].1).unwrap();
        assert_eq!(payload["type"], json!("mpc_config"));
        assert_eq!(payload["config"]["horizon"], json!(20));
    }

    #[tokio::test]
    async fn publish_failure_surfaces_as_an_error() {
        let publisher = RecordingPublisher::failing();
        let hub = SessionHub::new(publisher);

        let result = hub.on_control_command(json!({"x": 1})).await;
        assert!(matches!(result, Err(BridgeError::Publish(_))));
    }
}
