//! Structured outcomes of backend operations.
//!
//! Every backend operation returns [`BackendResult`]. Failures are declared
//! values, never panics: an adapter that cannot perform an operation
//! returns [`BackendError::Unsupported`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::BackendKind;

/// Result of a backend operation.
pub type BackendResult<T> = Result<T, BackendError>;

/// Declared failure reasons for backend operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    /// Training cannot start because no network exists.
    #[error("no network exists; create or load a network first")]
    NoNetwork,

    /// Training is already running or paused.
    #[error("training is already in progress")]
    AlreadyInProgress,

    /// The operation requires an active training run.
    #[error("training is not running")]
    NotTraining,

    /// The active backend variant does not implement this operation.
    #[error("{operation} is not supported by the {backend} backend")]
    Unsupported {
        operation: &'static str,
        backend: BackendKind,
    },

    /// Parameters failed validation.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// The backend could not be reached or is not initialized.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// A remote call exceeded its deadline.
    #[error("backend call timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The remote service answered with an error.
    #[error("remote service error ({status}): {message}")]
    Remote { status: u16, message: String },
}

impl BackendError {
    pub fn unsupported(operation: &'static str, backend: BackendKind) -> Self {
        BackendError::Unsupported { operation, backend }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        BackendError::Unavailable(message.into())
    }

    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            BackendError::NoNetwork => "NO_NETWORK",
            BackendError::AlreadyInProgress => "ALREADY_IN_PROGRESS",
            BackendError::NotTraining => "NOT_TRAINING",
            BackendError::Unsupported { .. } => "UNSUPPORTED",
            BackendError::InvalidParams(_) => "INVALID_PARAMS",
            BackendError::Unavailable(_) => "BACKEND_UNAVAILABLE",
            BackendError::Timeout { .. } => "BACKEND_TIMEOUT",
            BackendError::Remote { .. } => "REMOTE_ERROR",
        }
    }

    /// True for transport failures the caller may retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BackendError::Unavailable(_) | BackendError::Timeout { .. }
        )
    }
}

/// Successful outcome of a training-control operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlAck {
    pub is_training: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ControlAck {
    pub fn training(is_training: bool) -> Self {
        Self {
            is_training,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
