//! Decorator that serializes training-control mutations.
//!
//! Control operations on the wrapped backend take a shared mutex, so a
//! concurrent start and stop can never interleave. Reads pass straight
//! through and may run alongside each other and alongside a mutation.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::training::{
    BackendKind, BackendResult, ControlAck, DatasetInfo, DecisionBoundary, MetricsEntry,
    NetworkStats, NetworkTopology, TrainingParams, TrainingStateSnapshot,
};
use crate::ports::TrainingBackend;

/// Wraps a backend so at most one control mutation is in flight.
pub struct SerializedBackend {
    inner: Arc<dyn TrainingBackend>,
    control: Mutex<()>,
}

impl SerializedBackend {
    pub fn new(inner: Arc<dyn TrainingBackend>) -> Self {
        Self {
            inner,
            control: Mutex::new(()),
        }
    }

    pub fn inner(&self) -> &Arc<dyn TrainingBackend> {
        &self.inner
    }
}

#[async_trait]
impl TrainingBackend for SerializedBackend {
    fn backend_type(&self) -> BackendKind {
        self.inner.backend_type()
    }

    async fn initialize(&self) -> bool {
        let _guard = self.control.lock().await;
        self.inner.initialize().await
    }

    async fn shutdown(&self) {
        let _guard = self.control.lock().await;
        self.inner.shutdown().await
    }

    async fn start_training(
        &self,
        reset: bool,
        params: TrainingParams,
    ) -> BackendResult<ControlAck> {
        let _guard = self.control.lock().await;
        self.inner.start_training(reset, params).await
    }

    async fn stop_training(&self) -> BackendResult<ControlAck> {
        let _guard = self.control.lock().await;
        self.inner.stop_training().await
    }

    async fn pause_training(&self) -> BackendResult<ControlAck> {
        let _guard = self.control.lock().await;
        self.inner.pause_training().await
    }

    async fn resume_training(&self) -> BackendResult<ControlAck> {
        let _guard = self.control.lock().await;
        self.inner.resume_training().await
    }

    async fn reset_training(&self) -> BackendResult<ControlAck> {
        let _guard = self.control.lock().await;
        self.inner.reset_training().await
    }

    async fn apply_params(&self, params: TrainingParams) -> BackendResult<ControlAck> {
        let _guard = self.control.lock().await;
        self.inner.apply_params(params).await
    }

    async fn get_status(&self) -> BackendResult<TrainingStateSnapshot> {
        self.inner.get_status().await
    }

    async fn get_metrics(&self) -> BackendResult<Option<MetricsEntry>> {
        self.inner.get_metrics().await
    }

    async fn get_metrics_history(&self, count: usize) -> BackendResult<Vec<MetricsEntry>> {
        self.inner.get_metrics_history(count).await
    }

    async fn has_network(&self) -> bool {
        self.inner.has_network().await
    }

    async fn get_network_topology(&self) -> Option<NetworkTopology> {
        self.inner.get_network_topology().await
    }

    async fn get_network_stats(&self) -> NetworkStats {
        self.inner.get_network_stats().await
    }

    async fn get_dataset(&self) -> Option<DatasetInfo> {
        self.inner.get_dataset().await
    }

    async fn get_decision_boundary(&self, resolution: usize) -> Option<DecisionBoundary> {
        self.inner.get_decision_boundary(resolution).await
    }
}
