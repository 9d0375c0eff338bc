//! `pembridge-middleware` – the routing core of the bridge.
//!
//! Moves messages between the MQTT side and the browser side without caring
//! about their meaning.
//!
//! # Modules
//!
//! - [`router`] – pure, stateless translation between broker topics and
//!   browser events, and the reverse.
//! - [`hub`] – [`SessionHub`]: the set of live browser sessions, fan-out of
//!   broker events to all of them, fan-in of their control commands.
//! - [`publish`] – the [`ControlPublisher`] seam the hub uses to reach the
//!   broker without depending on any MQTT library.

pub mod hub;
pub mod publish;
pub mod router;

pub use hub::{SessionHandle, SessionHub};
pub use publish::ControlPublisher;
