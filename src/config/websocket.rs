//! WebSocket broadcast configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Connection manager, heartbeat and relay settings
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    /// Maximum concurrent sessions
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Seconds between server heartbeat pings
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    /// Seconds of client silence before a session is closed as stale
    #[serde(default = "default_stale_after")]
    pub stale_after_secs: u64,

    /// Milliseconds between relay polls of the backend
    #[serde(default = "default_relay_interval")]
    pub relay_interval_ms: u64,

    /// Outbound frames buffered per session before it counts as failed
    #[serde(default = "default_send_queue_capacity")]
    pub send_queue_capacity: usize,
}

impl WebSocketConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    pub fn relay_interval(&self) -> Duration {
        Duration::from_millis(self.relay_interval_ms)
    }

    /// Validate websocket configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_connections == 0 {
            return Err(ValidationError::InvalidWebSocket("max_connections must be positive"));
        }
        if self.heartbeat_interval_secs == 0 {
            return Err(ValidationError::InvalidWebSocket(
                "heartbeat_interval_secs must be positive",
            ));
        }
        if self.stale_after_secs < self.heartbeat_interval_secs {
            return Err(ValidationError::InvalidWebSocket(
                "stale_after_secs must be at least heartbeat_interval_secs",
            ));
        }
        if self.relay_interval_ms == 0 {
            return Err(ValidationError::InvalidWebSocket("relay_interval_ms must be positive"));
        }
        // The handshake alone queues three frames.
        if self.send_queue_capacity < 4 {
            return Err(ValidationError::InvalidWebSocket(
                "send_queue_capacity must be at least 4",
            ));
        }
        Ok(())
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            stale_after_secs: default_stale_after(),
            relay_interval_ms: default_relay_interval(),
            send_queue_capacity: default_send_queue_capacity(),
        }
    }
}

fn default_max_connections() -> usize {
    50
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_stale_after() -> u64 {
    90
}

fn default_relay_interval() -> u64 {
    500
}

fn default_send_queue_capacity() -> usize {
    256
}
