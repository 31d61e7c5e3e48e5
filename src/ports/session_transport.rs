//! Session transport port - the write half of one client connection.
//!
//! The connection manager owns one transport per session and writes
//! serialized frames to it from a dedicated task. The axum websocket sink
//! implements this port in production; tests use channel-backed fakes.

use async_trait::async_trait;
use thiserror::Error;

/// Failure writing to a client.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The peer has gone away.
    #[error("transport closed")]
    Closed,

    /// The write failed for another reason.
    #[error("transport write failed: {0}")]
    Write(String),
}

/// Write side of a client connection.
#[async_trait]
pub trait SessionTransport: Send + 'static {
    /// Sends one text frame.
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError>;

    /// Sends a close frame with a code and reason, then stops writing.
    async fn close(&mut self, code: u16, reason: &str);
}
