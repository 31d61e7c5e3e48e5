//! Training backend port - the capability set every training source exposes.
//!
//! Two adapters implement this port: the in-process demo simulator and the
//! remote training-service client. Route handlers, the websocket connection
//! manager and the metrics relay depend only on this trait.
//!
//! # Contract
//!
//! - Operations never panic on unsupported or failed work; they return a
//!   [`BackendError`] instead.
//! - `initialize` may be called repeatedly; a failed attempt returns `false`
//!   and leaves the backend safe to `shutdown`.
//! - `shutdown` never fails, even after a partial `initialize`.
//! - `get_metrics_history` returns at most `count` entries, oldest first and
//!   newest last.

use async_trait::async_trait;

use crate::domain::training::{
    BackendError, BackendKind, BackendResult, ControlAck, DatasetInfo, DecisionBoundary,
    MetricsEntry, NetworkStats, NetworkTopology, TrainingParams, TrainingStateSnapshot,
};

/// Port for a training source.
#[async_trait]
pub trait TrainingBackend: Send + Sync {
    /// Variant tag, used for logging and client display.
    fn backend_type(&self) -> BackendKind;

    /// Connects to the source and starts internal loops.
    async fn initialize(&self) -> bool;

    /// Stops internal loops and releases connections.
    async fn shutdown(&self);

    /// Starts training.
    ///
    /// Fails with [`BackendError::NoNetwork`] when no network exists and
    /// [`BackendError::AlreadyInProgress`] while training is active.
    async fn start_training(
        &self,
        reset: bool,
        params: TrainingParams,
    ) -> BackendResult<ControlAck>;

    /// Best-effort graceful stop.
    async fn stop_training(&self) -> BackendResult<ControlAck>;

    async fn pause_training(&self) -> BackendResult<ControlAck>;

    async fn resume_training(&self) -> BackendResult<ControlAck>;

    /// Clears progress and metrics, returning to a stopped state.
    async fn reset_training(&self) -> BackendResult<ControlAck>;

    /// Updates parameters of the current or next run.
    async fn apply_params(&self, params: TrainingParams) -> BackendResult<ControlAck>;

    async fn get_status(&self) -> BackendResult<TrainingStateSnapshot>;

    /// Latest metrics sample, `None` before the first epoch completes.
    async fn get_metrics(&self) -> BackendResult<Option<MetricsEntry>>;

    async fn get_metrics_history(&self, count: usize) -> BackendResult<Vec<MetricsEntry>>;

    async fn has_network(&self) -> bool;

    async fn get_network_topology(&self) -> Option<NetworkTopology>;

    async fn get_network_stats(&self) -> NetworkStats;

    async fn get_dataset(&self) -> Option<DatasetInfo>;

    /// Samples the network output over a `resolution x resolution` grid.
    ///
    /// `None` when there is no network or the backend cannot evaluate the
    /// model in-process.
    async fn get_decision_boundary(&self, resolution: usize) -> Option<DecisionBoundary>;
}

/// Shorthand used by adapters for operations they do not implement.
pub fn unsupported<T>(operation: &'static str, backend: BackendKind) -> BackendResult<T> {
    Err(BackendError::unsupported(operation, backend))
}
