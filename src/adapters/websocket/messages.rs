//! WebSocket message types for the training stream.
//!
//! Every server message is an envelope `{ "type", "timestamp", "data" }`
//! where `timestamp` is float unix seconds:
//! - Server → Client: `connection_established`, `initial_status`, `state`,
//!   `metrics`, `ping`, `pong`, `error`
//! - Client → Server: `ping`, `pong`, `request_state`

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{SessionId, Timestamp};
use crate::domain::training::{MetricsEntry, StatusSummary, TrainingStateSnapshot};

// ============================================
// Server → Client Messages
// ============================================

/// Envelope for everything sent to a client.
#[derive(Debug, Clone, Serialize)]
pub struct ServerMessage {
    #[serde(flatten)]
    pub payload: ServerPayload,
    pub timestamp: f64,
}

/// Message type tag plus its `data` body.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerPayload {
    /// First message of the handshake.
    ConnectionEstablished(ConnectionEstablished),
    /// Second message of the handshake.
    InitialStatus(StatusSummary),
    /// Full training state; third handshake message and relay updates.
    State(TrainingStateSnapshot),
    Metrics(MetricsEntry),
    /// Server heartbeat.
    Ping(Heartbeat),
    /// Reply to a client ping.
    Pong(Heartbeat),
    Error(ErrorData),
}

/// Body of `connection_established`.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionEstablished {
    pub client_id: String,
    pub heartbeat_interval_secs: u64,
    pub connected_clients: usize,
}

/// Body of `ping` and `pong`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Heartbeat {}

/// Body of `error`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorData {
    pub code: String,
    pub message: String,
}

impl ServerMessage {
    fn now(payload: ServerPayload) -> Self {
        Self {
            payload,
            timestamp: Timestamp::now().as_unix_secs_f64(),
        }
    }

    pub fn connection_established(
        client_id: SessionId,
        heartbeat_interval_secs: u64,
        connected_clients: usize,
    ) -> Self {
        Self::now(ServerPayload::ConnectionEstablished(ConnectionEstablished {
            client_id: client_id.to_string(),
            heartbeat_interval_secs,
            connected_clients,
        }))
    }

    pub fn initial_status(summary: StatusSummary) -> Self {
        Self::now(ServerPayload::InitialStatus(summary))
    }

    pub fn state(snapshot: TrainingStateSnapshot) -> Self {
        Self::now(ServerPayload::State(snapshot))
    }

    pub fn metrics(entry: MetricsEntry) -> Self {
        Self::now(ServerPayload::Metrics(entry))
    }

    pub fn ping() -> Self {
        Self::now(ServerPayload::Ping(Heartbeat::default()))
    }

    pub fn pong() -> Self {
        Self::now(ServerPayload::Pong(Heartbeat::default()))
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::now(ServerPayload::Error(ErrorData {
            code: code.into(),
            message: message.into(),
        }))
    }

    /// Wire tag of this message.
    pub fn type_name(&self) -> &'static str {
        match self.payload {
            ServerPayload::ConnectionEstablished(_) => "connection_established",
            ServerPayload::InitialStatus(_) => "initial_status",
            ServerPayload::State(_) => "state",
            ServerPayload::Metrics(_) => "metrics",
            ServerPayload::Ping(_) => "ping",
            ServerPayload::Pong(_) => "pong",
            ServerPayload::Error(_) => "error",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ============================================
// Client → Server Messages
// ============================================

/// All message types that can be received from a client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Answered with `pong`.
    Ping,
    /// Liveness only.
    Pong,
    /// Answered with a `state` message to the requesting session.
    RequestState,
}
