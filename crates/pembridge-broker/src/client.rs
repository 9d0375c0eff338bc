//! [`BrokerClient`] – owns the single connection to the MQTT broker.
//!
//! The client subscribes to every topic in the fixed registry each time the
//! broker acknowledges a connection, so a broker restart re-establishes the
//! subscriptions without any state of our own.  Reconnection itself is the
//! transport library's default behavior: a failed poll is logged and the
//! next poll dials again.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tracing::{info, warn};

use pembridge_middleware::{ControlPublisher, SessionHub, router};
use pembridge_types::{BridgeError, Topic};

/// Keep-alive interval for the broker connection.
const KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Pause between polls after a connection error, so a dead broker does not
/// spin the event loop.
const RECONNECT_PAUSE: Duration = Duration::from_secs(1);

/// The bridge's one MQTT connection: an async client handle plus the event
/// loop that drives it.
pub struct BrokerClient {
    client: AsyncClient,
    eventloop: EventLoop,
}

impl BrokerClient {
    /// Build the client for `host:port`.
    ///
    /// Nothing is dialed until [`run`][Self::run] polls the event loop.
    pub fn connect(host: &str, port: u16, client_id: &str) -> Self {
        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(KEEP_ALIVE);
        let (client, eventloop) = AsyncClient::new(options, 64);
        Self { client, eventloop }
    }

    /// A cloneable publish handle for the hub's command fan-in.
    pub fn publisher(&self) -> MqttPublisher {
        MqttPublisher {
            client: self.client.clone(),
        }
    }

    /// Drive the connection until the process exits.
    ///
    /// * `ConnAck` – (re)subscribe to the full topic registry.  Individual
    ///   subscription failures are logged and otherwise ignored.
    /// * `Publish` – route the message and broadcast the resulting events to
    ///   every connected session; undecodable payloads are logged and
    ///   dropped.
    /// * poll error – logged, then the loop continues; the library redials
    ///   on the next poll.
    pub async fn run(mut self, hub: Arc<SessionHub>) {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("connected to MQTT broker");
                    for topic in Topic::ALL {
                        if let Err(e) = self.client.subscribe(topic.name(), QoS::AtMostOnce).await
                        {
                            warn!(topic = %topic, error = %e, "subscribe failed");
                        }
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    handle_inbound(&publish.topic, &publish.payload, &hub);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "MQTT connection error");
                    tokio::time::sleep(RECONNECT_PAUSE).await;
                }
            }
        }
    }
}

/// Route one inbound broker message and fan it out to all sessions.
///
/// A decode failure is a local event: logged at warn, message dropped, no
/// events emitted.
pub(crate) fn handle_inbound(topic: &str, payload: &[u8], hub: &SessionHub) {
    match router::route_inbound(topic, payload) {
        Ok(events) => {
            for event in events {
                hub.broadcast(event);
            }
        }
        Err(e) => {
            warn!(error = %e, "dropping undecodable broker message");
        }
    }
}

/// Publish handle handed to the [`SessionHub`].
///
/// Publishes are QoS 0 with no retain flag, matching the at-most-once
/// contract of the bridge; no acknowledgement is awaited beyond the client
/// library's own queueing.
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
}

#[async_trait]
impl ControlPublisher for MqttPublisher {
    async fn publish(&self, topic: Topic, payload: String) -> Result<(), BridgeError> {
        self.client
            .publish(topic.name(), QoS::AtMostOnce, false, payload)
            .await
            .map_err(|e| BridgeError::Publish(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pembridge_types::EventName;
    use serde_json::json;

    /// Publisher stub for hub construction; inbound routing never publishes.
    struct NullPublisher;

    #[async_trait]
    impl ControlPublisher for NullPublisher {
        async fn publish(&self, _topic: Topic, _payload: String) -> Result<(), BridgeError> {
            Ok(())
        }
    }

    fn make_hub() -> Arc<SessionHub> {
        Arc::new(SessionHub::new(Arc::new(NullPublisher)))
    }

    #[tokio::test]
    async fn inbound_matlab_message_fans_out_both_events() {
        let hub = make_hub();
        let mut session = hub.register();

        handle_inbound("pem/matlab/data", br#"{"stack_voltage": 47.9}"#, &hub);

        let first = session.events.recv().await.unwrap();
        assert_eq!(first.event, EventName::MqttData);
        assert_eq!(first.data["topic"], json!("pem/matlab/data"));

        let second = session.events.recv().await.unwrap();
        assert_eq!(second.event, EventName::MatlabUpdate);
        assert_eq!(second.data["stack_voltage"], json!(47.9));
    }

    #[tokio::test]
    async fn undecodable_inbound_message_broadcasts_nothing() {
        let hub = make_hub();
        let mut session = hub.register();

        handle_inbound("pem/arduino/data", b"\x00\x01 not json", &hub);

        assert!(session.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn inbound_message_with_no_sessions_is_dropped_quietly() {
        let hub = make_hub();
        // Must not panic or error with an empty session set.
        handle_inbound("pem/mpc/comparison", br#"{"mpc": 0.1}"#, &hub);
        assert_eq!(hub.session_count(), 0);
    }

    #[tokio::test]
    async fn client_is_constructed_without_dialing() {
        // connect() must be safe to call with no broker running.
        let broker = BrokerClient::connect("localhost", 1883, "pembridge-test");
        let _publisher = broker.publisher();
    }
}
