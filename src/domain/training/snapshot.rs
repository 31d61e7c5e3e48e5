//! Point-in-time views of the training run.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

use super::{BackendKind, MetricsEntry, TrainingPhase, TrainingStatus};

/// Immutable snapshot of the training state.
///
/// Produced by the active backend on demand and serialized as the `data`
/// of every `state` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingStateSnapshot {
    pub status: TrainingStatus,
    pub phase: TrainingPhase,
    pub learning_rate: f64,
    pub max_hidden_units: u32,
    pub max_epochs: u64,
    pub current_epoch: u64,
    pub current_step: u64,
    pub network_name: String,
    pub dataset_name: String,
    pub threshold_function: String,
    pub optimizer_name: String,
    /// Capture time as fractional unix seconds.
    pub timestamp: f64,
}

impl TrainingStateSnapshot {
    /// A stopped, idle snapshot with no network or dataset attached.
    pub fn idle() -> Self {
        Self {
            status: TrainingStatus::Stopped,
            phase: TrainingPhase::Idle,
            learning_rate: 0.0,
            max_hidden_units: 0,
            max_epochs: 0,
            current_epoch: 0,
            current_step: 0,
            network_name: String::new(),
            dataset_name: String::new(),
            threshold_function: String::new(),
            optimizer_name: String::new(),
            timestamp: Timestamp::now().as_unix_secs_f64(),
        }
    }

    pub fn is_training(&self) -> bool {
        self.status.is_active()
    }

    /// Compares two snapshots ignoring their capture time.
    pub fn same_state_as(&self, other: &TrainingStateSnapshot) -> bool {
        Self {
            timestamp: 0.0,
            ..self.clone()
        } == Self {
            timestamp: 0.0,
            ..other.clone()
        }
    }
}

/// Summary sent as `initial_status` when a client connects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub backend_type: BackendKind,
    pub status: TrainingStatus,
    pub phase: TrainingPhase,
    pub is_training: bool,
    pub has_network: bool,
    pub current_epoch: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_metrics: Option<MetricsEntry>,
}

impl StatusSummary {
    pub fn from_snapshot(
        backend_type: BackendKind,
        snapshot: &TrainingStateSnapshot,
        has_network: bool,
        latest_metrics: Option<MetricsEntry>,
    ) -> Self {
        Self {
            backend_type,
            status: snapshot.status,
            phase: snapshot.phase,
            is_training: snapshot.is_training(),
            has_network,
            current_epoch: snapshot.current_epoch,
            latest_metrics,
        }
    }
}
