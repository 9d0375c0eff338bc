//! `pembridge-broker` – the MQTT side of the bridge.
//!
//! Owns the single broker connection.  Inbound publishes flow through the
//! router onto the [`SessionHub`][pembridge_middleware::SessionHub]; browser
//! commands come back through the [`MqttPublisher`], which implements the
//! hub's [`ControlPublisher`][pembridge_middleware::ControlPublisher] seam.

pub mod client;

pub use client::{BrokerClient, MqttPublisher};
