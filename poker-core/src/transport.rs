//! The opaque framed message channel boundary: the transport handshake
//! itself is out of scope here. `poker-core` only sees these traits;
//! `poker-transport` supplies the concrete Axum WebSocket-backed
//! implementation.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("connection closed normally")]
    ClosedNormal,
    /// Going-away / no-status-received: expected, logged at most at debug.
    #[error("connection going away")]
    GoingAway,
    #[error("transport error: {0}")]
    Other(String),
}

#[async_trait]
pub trait ChannelReader: Send {
    /// Block for the next text frame. Returns `Err` once the
    /// connection is closed or errors; never panics on malformed input
    /// — framing/decoding errors are the session's job, not the
    /// transport's.
    async fn recv(&mut self) -> Result<String, ChannelError>;
}

#[async_trait]
pub trait ChannelWriter: Send {
    async fn send_text(&mut self, text: String) -> Result<(), ChannelError>;

    /// Transport-level liveness probe with an implementation-chosen
    /// timeout; failure is treated exactly like a write failure.
    async fn ping(&mut self) -> Result<(), ChannelError>;

    async fn close(&mut self);
}

/// A bidirectional framed connection that can be split into an
/// independent reader/writer pair, mirroring how both cooperative
/// session tasks keep working off the same underlying transport handle.
pub trait FramedChannel: Send {
    fn split(self: Box<Self>) -> (Box<dyn ChannelReader>, Box<dyn ChannelWriter>);
}
