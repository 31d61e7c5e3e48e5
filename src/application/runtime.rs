//! Training runtime - owns the backend and the background tasks.
//!
//! # Lifecycle
//!
//! ```text
//! start:    create_backend ─▶ initialize ─▶ ConnectionManager ─▶ spawn relay + heartbeat + purge
//! shutdown: cancel tasks ─▶ await tasks ─▶ close sessions ─▶ backend.shutdown()
//! ```
//!
//! The relay and heartbeat stop before the backend is torn down, so neither
//! polls a half-shut backend.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::adapters::backend::create_backend;
use crate::adapters::rate_limiter::run_purge;
use crate::adapters::http::{AppState, SecurityState};
use crate::adapters::websocket::{run_heartbeat, ConnectionManager, MetricsRelay, RelayHandle};
use crate::config::AppConfig;
use crate::domain::training::BackendError;
use crate::ports::TrainingBackend;

const TASK_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Running backend plus its background tasks.
pub struct TrainingRuntime {
    backend: Arc<dyn TrainingBackend>,
    manager: Arc<ConnectionManager>,
    relay: RelayHandle,
    security: SecurityState,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl TrainingRuntime {
    /// Builds and starts everything from config.
    ///
    /// Fails only when the backend cannot be constructed. A backend whose
    /// `initialize` reports `false` is kept: reads then fail individually and
    /// readiness reports unavailable.
    pub async fn start(config: &AppConfig) -> Result<Self, BackendError> {
        let backend = create_backend(&config.backend, &config.demo)?;
        Ok(Self::with_backend(backend, config).await)
    }

    /// Starts the runtime around an existing backend.
    pub async fn with_backend(backend: Arc<dyn TrainingBackend>, config: &AppConfig) -> Self {
        let kind = backend.backend_type();
        if backend.initialize().await {
            tracing::info!(backend = %kind, "Training backend initialized");
        } else {
            tracing::warn!(backend = %kind, "Training backend failed to initialize");
        }

        let manager = Arc::new(ConnectionManager::new(backend.clone(), &config.websocket));
        let cancel = CancellationToken::new();

        let relay = MetricsRelay::new(manager.clone(), config.websocket.relay_interval());
        let relay_handle = relay.handle();
        let relay_task = tokio::spawn(relay.run(cancel.child_token()));

        let heartbeat_task = tokio::spawn(run_heartbeat(
            manager.clone(),
            config.websocket.heartbeat_interval(),
            config.websocket.stale_after(),
            cancel.child_token(),
        ));

        let security = SecurityState::from_config(&config.security);
        let mut tasks = vec![relay_task, heartbeat_task];
        if security.rate_limit_enabled() {
            tasks.push(tokio::spawn(run_purge(
                security.limiter().clone(),
                config.security.rate_limit_window(),
                cancel.child_token(),
            )));
        }

        Self {
            backend,
            manager,
            relay: relay_handle,
            security,
            cancel,
            tasks,
        }
    }

    pub fn backend(&self) -> &Arc<dyn TrainingBackend> {
        &self.backend
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// State for [`build_router`](crate::adapters::http::build_router).
    pub fn app_state(&self) -> AppState {
        AppState {
            backend: self.backend.clone(),
            manager: self.manager.clone(),
            relay: self.relay.clone(),
            security: self.security.clone(),
        }
    }

    /// Stops tasks, closes sessions, then shuts the backend down.
    pub async fn shutdown(self) {
        tracing::info!("Shutting down training runtime");
        self.cancel.cancel();

        for task in self.tasks {
            match tokio::time::timeout(TASK_JOIN_TIMEOUT, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "Background task ended abnormally"),
                Err(_) => tracing::warn!("Background task did not stop in time"),
            }
        }

        self.manager.close_all().await;
        self.backend.shutdown().await;
        tracing::info!("Training runtime stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::websocket::{MemoryTransport, CLOSE_GOING_AWAY};
    use crate::config::BackendConfig;

    fn demo_config() -> AppConfig {
        AppConfig {
            backend: BackendConfig {
                demo_mode: Some("1".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn start_initializes_demo_backend() {
        let runtime = TrainingRuntime::start(&demo_config()).await.unwrap();

        assert!(runtime.backend().has_network().await);
        assert_eq!(runtime.manager().session_count().await, 0);

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_closes_sessions_and_stops_backend() {
        let runtime = TrainingRuntime::start(&demo_config()).await.unwrap();
        runtime
            .backend()
            .start_training(false, Default::default())
            .await
            .unwrap();

        let (transport, mut client) = MemoryTransport::pair();
        runtime.manager().connect(transport).await.unwrap();
        let backend = runtime.backend().clone();
        let manager = runtime.manager().clone();

        runtime.shutdown().await;

        assert_eq!(manager.session_count().await, 0);
        assert!(!manager.has_capacity().await);
        assert!(!backend.get_status().await.unwrap().is_training());
        assert_eq!(client.close_code().await, Some(CLOSE_GOING_AWAY));
    }

    #[tokio::test]
    async fn purge_task_runs_only_with_rate_limiting() {
        let runtime = TrainingRuntime::start(&demo_config()).await.unwrap();
        assert_eq!(runtime.tasks.len(), 3);
        runtime.shutdown().await;

        let mut config = demo_config();
        config.security.rate_limit_enabled = false;
        let runtime = TrainingRuntime::start(&config).await.unwrap();
        assert_eq!(runtime.tasks.len(), 2);
        runtime.shutdown().await;
    }
}
