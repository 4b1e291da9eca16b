//! Room-coordination engine: the transport-agnostic core of the
//! planning-poker server. Everything here is pure logic plus `tokio`
//! channels — no HTTP, no WebSocket framing, no process wiring. Those
//! live in `poker-transport` and `poker-server`.

pub mod message;
pub mod query;
pub mod registry;
pub mod room;
pub mod session;
pub mod transport;
pub mod verifier;
