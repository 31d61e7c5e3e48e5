//! Channel-backed transport for driving the connection manager without a
//! socket. Used by tests and in-process consumers.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::ports::{SessionTransport, TransportError};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// One frame written by the server.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Close { code: u16, reason: String },
}

/// Server side of an in-memory connection.
pub struct MemoryTransport {
    tx: mpsc::UnboundedSender<Frame>,
    stalled: bool,
}

/// Client side of an in-memory connection.
pub struct MemoryClient {
    rx: mpsc::UnboundedReceiver<Frame>,
}

impl MemoryTransport {
    pub fn pair() -> (Self, MemoryClient) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, stalled: false }, MemoryClient { rx })
    }

    /// A transport whose text writes never complete, like a peer that
    /// stopped reading.
    pub fn stalled() -> (Self, MemoryClient) {
        let (mut transport, client) = Self::pair();
        transport.stalled = true;
        (transport, client)
    }
}

#[async_trait]
impl SessionTransport for MemoryTransport {
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        if self.stalled {
            std::future::pending::<()>().await;
        }
        self.tx
            .send(Frame::Text(text.to_string()))
            .map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self, code: u16, reason: &str) {
        let _ = self.tx.send(Frame::Close {
            code,
            reason: reason.to_string(),
        });
    }
}

impl MemoryClient {
    /// Next frame, or `None` after the timeout or once the server side is gone.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        tokio::time::timeout(RECV_TIMEOUT, self.rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Next text frame parsed as JSON. `None` on close, timeout or bad JSON.
    pub async fn next_json(&mut self) -> Option<serde_json::Value> {
        match self.next_frame().await? {
            Frame::Text(text) => serde_json::from_str(&text).ok(),
            Frame::Close { .. } => None,
        }
    }

    /// The `type` tags of the next `n` messages. Stops early on close or
    /// timeout.
    pub async fn next_types(&mut self, n: usize) -> Vec<String> {
        let mut types = Vec::with_capacity(n);
        while types.len() < n {
            let Some(message) = self.next_json().await else {
                break;
            };
            types.push(message["type"].as_str().unwrap_or_default().to_string());
        }
        types
    }

    /// Skips text frames until a close frame arrives; returns its code.
    pub async fn close_code(&mut self) -> Option<u16> {
        loop {
            match self.next_frame().await? {
                Frame::Close { code, .. } => return Some(code),
                Frame::Text(_) => continue,
            }
        }
    }

    /// Frames already delivered, without waiting.
    pub async fn received(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.rx.try_recv() {
            frames.push(frame);
        }
        frames
    }
}
