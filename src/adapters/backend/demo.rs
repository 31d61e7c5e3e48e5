//! In-process demo backend.
//!
//! Wraps a [`CascadeSimulator`] behind a tokio `RwLock` and advances it on a
//! background task, one epoch per configured tick. Every read takes the lock
//! once, so snapshots are internally consistent.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::simulator::CascadeSimulator;
use crate::config::DemoConfig;
use crate::domain::training::{
    BackendError, BackendKind, BackendResult, ControlAck, DatasetInfo, DecisionBoundary,
    MetricsEntry, NetworkStats, NetworkTopology, TrainingParams, TrainingStateSnapshot,
    TrainingStatus,
};
use crate::ports::TrainingBackend;

struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Simulated training backend used when no remote service is configured.
pub struct DemoBackend {
    config: DemoConfig,
    state: Arc<RwLock<CascadeSimulator>>,
    worker: Mutex<Option<Worker>>,
}

impl DemoBackend {
    /// Creates a backend with no network. [`TrainingBackend::initialize`]
    /// creates the network and starts the simulation task.
    pub fn new(config: DemoConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(CascadeSimulator::new(config.clone()))),
            config,
            worker: Mutex::new(None),
        }
    }

    async fn run(
        state: Arc<RwLock<CascadeSimulator>>,
        config: DemoConfig,
        cancel: CancellationToken,
    ) {
        let tick = config.tick();
        let mut interval = tokio::time::interval_at(Instant::now() + tick, tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    state.write().await.step_epoch();
                }
            }
        }

        tracing::debug!("Demo simulation task stopped");
    }

    fn ack(sim: &CascadeSimulator, message: &str) -> ControlAck {
        ControlAck::training(sim.status().is_active()).with_message(message)
    }
}

#[async_trait]
impl TrainingBackend for DemoBackend {
    fn backend_type(&self) -> BackendKind {
        BackendKind::Demo
    }

    async fn initialize(&self) -> bool {
        let mut worker = self.worker.lock().await;
        if worker.is_some() {
            return true;
        }

        {
            let mut sim = self.state.write().await;
            if !sim.has_network() {
                sim.create_network();
            }
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Self::run(
            Arc::clone(&self.state),
            self.config.clone(),
            cancel.clone(),
        ));
        *worker = Some(Worker { cancel, handle });

        tracing::info!(
            tick_ms = self.config.tick_ms,
            seed = self.config.seed,
            "Demo backend initialized"
        );
        true
    }

    async fn shutdown(&self) {
        let worker = self.worker.lock().await.take();
        if let Some(worker) = worker {
            worker.cancel.cancel();
            if let Err(e) = worker.handle.await {
                tracing::warn!(error = %e, "Demo simulation task ended abnormally");
            }
        }
        self.state.write().await.set_status(TrainingStatus::Stopped);
        tracing::info!("Demo backend shut down");
    }

    async fn start_training(
        &self,
        reset: bool,
        params: TrainingParams,
    ) -> BackendResult<ControlAck> {
        params.validate()?;
        let mut sim = self.state.write().await;
        if !sim.has_network() {
            return Err(BackendError::NoNetwork);
        }
        if sim.status().is_active() {
            return Err(BackendError::AlreadyInProgress);
        }

        sim.apply_params(&params);
        sim.begin(reset);
        tracing::info!(reset, "Demo training started");
        Ok(Self::ack(&sim, "training started"))
    }

    async fn stop_training(&self) -> BackendResult<ControlAck> {
        let mut sim = self.state.write().await;
        if sim.status() == TrainingStatus::Stopped {
            return Ok(Self::ack(&sim, "training already stopped"));
        }
        sim.set_status(TrainingStatus::Stopped);
        tracing::info!("Demo training stopped");
        Ok(Self::ack(&sim, "training stopped"))
    }

    async fn pause_training(&self) -> BackendResult<ControlAck> {
        let mut sim = self.state.write().await;
        match sim.status() {
            TrainingStatus::Started => {
                sim.set_status(TrainingStatus::Paused);
                Ok(Self::ack(&sim, "training paused"))
            }
            TrainingStatus::Paused => Ok(Self::ack(&sim, "training already paused")),
            TrainingStatus::Stopped => Err(BackendError::NotTraining),
        }
    }

    async fn resume_training(&self) -> BackendResult<ControlAck> {
        let mut sim = self.state.write().await;
        match sim.status() {
            TrainingStatus::Paused => {
                sim.set_status(TrainingStatus::Started);
                Ok(Self::ack(&sim, "training resumed"))
            }
            TrainingStatus::Started => Ok(Self::ack(&sim, "training already running")),
            TrainingStatus::Stopped => Err(BackendError::NotTraining),
        }
    }

    async fn reset_training(&self) -> BackendResult<ControlAck> {
        let mut sim = self.state.write().await;
        sim.reset_progress();
        tracing::info!("Demo training reset");
        Ok(Self::ack(&sim, "training reset"))
    }

    async fn apply_params(&self, params: TrainingParams) -> BackendResult<ControlAck> {
        if params.is_empty() {
            return Err(BackendError::InvalidParams(
                "no parameters supplied".to_string(),
            ));
        }
        params.validate()?;
        let mut sim = self.state.write().await;
        sim.apply_params(&params);
        Ok(Self::ack(&sim, "parameters applied"))
    }

    async fn get_status(&self) -> BackendResult<TrainingStateSnapshot> {
        Ok(self.state.read().await.snapshot())
    }

    async fn get_metrics(&self) -> BackendResult<Option<MetricsEntry>> {
        Ok(self.state.read().await.latest_metrics())
    }

    async fn get_metrics_history(&self, count: usize) -> BackendResult<Vec<MetricsEntry>> {
        Ok(self.state.read().await.metrics_history(count))
    }

    async fn has_network(&self) -> bool {
        self.state.read().await.has_network()
    }

    async fn get_network_topology(&self) -> Option<NetworkTopology> {
        self.state.read().await.network().map(|n| n.topology())
    }

    async fn get_network_stats(&self) -> NetworkStats {
        self.get_network_topology()
            .await
            .map(|t| NetworkStats::from_topology(&t))
            .unwrap_or_default()
    }

    async fn get_dataset(&self) -> Option<DatasetInfo> {
        Some(self.state.read().await.dataset().clone())
    }

    async fn get_decision_boundary(&self, resolution: usize) -> Option<DecisionBoundary> {
        let network = self.state.read().await.network().cloned()?;
        match tokio::task::spawn_blocking(move || network.decision_boundary(resolution)).await {
            Ok(boundary) => Some(boundary),
            Err(e) => {
                tracing::warn!(error = %e, "Decision boundary computation failed");
                None
            }
        }
    }
}
