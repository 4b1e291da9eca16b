//! Concrete adapters plugging `poker-core`'s traits into the outside
//! world: an Axum `WebSocket` transport and an Argon2id verifier.

pub mod verifier;
pub mod ws_transport;

pub use verifier::Argon2Verifier;
pub use ws_transport::WebSocketChannel;
