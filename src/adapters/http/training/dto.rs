//! HTTP DTOs for training endpoints.
//!
//! Read endpoints return the domain value types directly; they are already
//! shaped for serialization.

use serde::{Deserialize, Serialize};

use crate::domain::training::{ControlAck, MetricsEntry, TrainingParams};

/// Default number of history entries returned.
pub const DEFAULT_HISTORY_COUNT: usize = 100;
/// Upper bound on `count` for history requests.
pub const MAX_HISTORY_COUNT: usize = 1000;
/// Default decision-boundary grid resolution.
pub const DEFAULT_BOUNDARY_RESOLUTION: usize = 50;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /api/train/start`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartTrainingRequest {
    #[serde(default)]
    pub reset: bool,
    #[serde(flatten)]
    pub params: TrainingParams,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    pub count: Option<usize>,
}

impl HistoryQuery {
    /// Requested count, defaulted and capped.
    pub fn effective_count(&self) -> usize {
        self.count
            .unwrap_or(DEFAULT_HISTORY_COUNT)
            .min(MAX_HISTORY_COUNT)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoundaryQuery {
    pub resolution: Option<usize>,
}

impl BoundaryQuery {
    pub fn effective_resolution(&self) -> usize {
        self.resolution.unwrap_or(DEFAULT_BOUNDARY_RESOLUTION)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Successful control operation.
#[derive(Debug, Clone, Serialize)]
pub struct ControlResponse {
    pub ok: bool,
    pub is_training: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<ControlAck> for ControlResponse {
    fn from(ack: ControlAck) -> Self {
        Self {
            ok: true,
            is_training: ack.is_training,
            message: ack.message,
        }
    }
}

/// Failed operation: `{ok: false, error, code}`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: error.into(),
            code: code.into(),
        }
    }

    pub fn unavailable(what: &str) -> Self {
        Self::new("UNAVAILABLE", format!("{} is not available", what))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsHistoryResponse {
    pub count: usize,
    pub history: Vec<MetricsEntry>,
}
