//! Background tasks feeding the connection manager.
//!
//! # Flow
//!
//! ```text
//! interval tick ──┐
//!                 ├──▶ MetricsRelay::poll_once ──▶ backend.get_status / get_metrics
//! nudge() ────────┘              │
//!                                ▼ changed?
//!                     ConnectionManager::broadcast
//! ```
//!
//! The relay sends `state` only when the snapshot differs from the last one
//! sent (ignoring its timestamp) or a session has joined since, and
//! `metrics` only for a newer sample. The heartbeat task pings every
//! session and closes the ones gone silent.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::connections::ConnectionManager;
use super::messages::ServerMessage;
use crate::domain::training::{MetricsEntry, TrainingStateSnapshot};

/// Wakes the relay so a change is pushed without waiting for the next tick.
#[derive(Clone, Default)]
pub struct RelayHandle {
    nudge: Arc<Notify>,
}

impl RelayHandle {
    pub fn nudge(&self) {
        self.nudge.notify_one();
    }
}

/// What a single poll broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayOutcome {
    pub state_sent: bool,
    pub metrics_sent: bool,
}

/// Polls the backend and broadcasts changes.
pub struct MetricsRelay {
    manager: Arc<ConnectionManager>,
    interval: Duration,
    handle: RelayHandle,
    last_state: Option<TrainingStateSnapshot>,
    last_metrics: Option<MetricsEntry>,
    /// `joined_count` as of the last state broadcast.
    last_joined: u64,
}

impl MetricsRelay {
    pub fn new(manager: Arc<ConnectionManager>, interval: Duration) -> Self {
        Self {
            manager,
            interval,
            handle: RelayHandle::default(),
            last_state: None,
            last_metrics: None,
            last_joined: 0,
        }
    }

    pub fn handle(&self) -> RelayHandle {
        self.handle.clone()
    }

    /// Polls once and broadcasts whatever changed. Does nothing while no
    /// session is connected.
    pub async fn poll_once(&mut self) -> RelayOutcome {
        let mut outcome = RelayOutcome::default();
        if self.manager.session_count().await == 0 {
            return outcome;
        }
        let backend = Arc::clone(self.manager.backend());
        // Read before the status so a session joining mid-poll is caught next time.
        let joined = self.manager.joined_count();

        match backend.get_status().await {
            Ok(snapshot) => {
                let changed = joined != self.last_joined
                    || self
                        .last_state
                        .as_ref()
                        .map_or(true, |last| !last.same_state_as(&snapshot));
                if changed {
                    self.manager
                        .broadcast(&ServerMessage::state(snapshot.clone()))
                        .await;
                    self.last_state = Some(snapshot);
                    self.last_joined = joined;
                    outcome.state_sent = true;
                }
            }
            Err(e) => tracing::debug!(error = %e, "Relay status poll failed"),
        }

        match backend.get_metrics().await {
            Ok(Some(entry)) => {
                let newer = self
                    .last_metrics
                    .as_ref()
                    .map_or(true, |last| entry.is_newer_than(last));
                if newer {
                    self.manager
                        .broadcast(&ServerMessage::metrics(entry.clone()))
                        .await;
                    self.last_metrics = Some(entry);
                    outcome.metrics_sent = true;
                }
            }
            // History was cleared; the next sample counts as new.
            Ok(None) => self.last_metrics = None,
            Err(e) => tracing::debug!(error = %e, "Relay metrics poll failed"),
        }

        outcome
    }

    /// Runs until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let nudge = Arc::clone(&self.handle.nudge);

        tracing::info!(interval_ms = self.interval.as_millis() as u64, "Metrics relay started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
                _ = nudge.notified() => {}
            }
            self.poll_once().await;
        }
        tracing::info!("Metrics relay stopped");
    }
}

/// Pings every session each `interval` and closes sessions silent for
/// longer than `stale_after`. Runs until `cancel` fires.
pub async fn run_heartbeat(
    manager: Arc<ConnectionManager>,
    interval: Duration,
    stale_after: Duration,
    cancel: CancellationToken,
) {
    let start = tokio::time::Instant::now() + interval;
    let mut ticker = tokio::time::interval_at(start, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if manager.session_count().await == 0 {
                    continue;
                }
                manager.broadcast(&ServerMessage::ping()).await;
                let reaped = manager.reap_stale(stale_after).await;
                if reaped > 0 {
                    tracing::info!(reaped, "Closed stale WebSocket sessions");
                }
            }
        }
    }
    tracing::debug!("Heartbeat stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::backend::DemoBackend;
    use crate::adapters::websocket::memory::MemoryTransport;
    use crate::config::{DemoConfig, WebSocketConfig};
    use crate::domain::training::TrainingParams;
    use crate::ports::TrainingBackend;

    fn setup() -> (Arc<dyn TrainingBackend>, Arc<ConnectionManager>) {
        let backend: Arc<dyn TrainingBackend> = Arc::new(DemoBackend::new(DemoConfig {
            tick_ms: 60_000,
            ..Default::default()
        }));
        let manager = Arc::new(ConnectionManager::new(
            Arc::clone(&backend),
            &WebSocketConfig::default(),
        ));
        (backend, manager)
    }

    #[tokio::test]
    async fn idle_without_sessions() {
        let (_backend, manager) = setup();
        let mut relay = MetricsRelay::new(manager, Duration::from_millis(10));
        assert_eq!(relay.poll_once().await, RelayOutcome::default());
    }

    #[tokio::test]
    async fn unchanged_state_is_sent_once() {
        let (_backend, manager) = setup();
        let (transport, mut client) = MemoryTransport::pair();
        manager.connect(transport).await.unwrap();
        let mut relay = MetricsRelay::new(Arc::clone(&manager), Duration::from_millis(10));

        assert!(relay.poll_once().await.state_sent);
        assert!(!relay.poll_once().await.state_sent);

        let types = client.next_types(4).await;
        assert_eq!(types[3], "state");
    }

    #[tokio::test]
    async fn new_session_triggers_state_resend() {
        let (_backend, manager) = setup();
        let (first, mut first_client) = MemoryTransport::pair();
        manager.connect(first).await.unwrap();
        let mut relay = MetricsRelay::new(Arc::clone(&manager), Duration::from_millis(10));
        assert!(relay.poll_once().await.state_sent);
        assert!(!relay.poll_once().await.state_sent);

        // The newcomer's handshake snapshot may predate the last broadcast.
        let (second, mut second_client) = MemoryTransport::pair();
        manager.connect(second).await.unwrap();
        assert!(relay.poll_once().await.state_sent);
        assert!(!relay.poll_once().await.state_sent);

        assert_eq!(second_client.next_types(4).await[3], "state");
        assert_eq!(first_client.next_types(5).await[4], "state");
    }

    #[tokio::test]
    async fn state_change_is_broadcast() {
        let (backend, manager) = setup();
        backend.initialize().await;
        let (transport, mut client) = MemoryTransport::pair();
        manager.connect(transport).await.unwrap();
        let mut relay = MetricsRelay::new(Arc::clone(&manager), Duration::from_millis(10));
        relay.poll_once().await;

        backend
            .start_training(false, TrainingParams::default())
            .await
            .unwrap();
        assert!(relay.poll_once().await.state_sent);

        client.next_types(4).await;
        let state = client.next_json().await.unwrap();
        assert_eq!(state["type"], "state");
        assert_eq!(state["data"]["status"], "started");
        backend.shutdown().await;
    }

    #[tokio::test]
    async fn nudge_triggers_poll_before_tick() {
        let (backend, manager) = setup();
        backend.initialize().await;
        let (transport, mut client) = MemoryTransport::pair();
        manager.connect(transport).await.unwrap();

        let relay = MetricsRelay::new(Arc::clone(&manager), Duration::from_secs(3600));
        let handle = relay.handle();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(relay.run(cancel.clone()));

        // First tick fires immediately; the next one is an hour away.
        assert_eq!(client.next_types(4).await.len(), 4);

        backend
            .start_training(false, TrainingParams::default())
            .await
            .unwrap();
        handle.nudge();

        let state = client.next_json().await.unwrap();
        assert_eq!(state["type"], "state");
        assert_eq!(state["data"]["status"], "started");

        cancel.cancel();
        task.await.unwrap();
        backend.shutdown().await;
    }

    #[tokio::test]
    async fn heartbeat_pings_sessions() {
        let (_backend, manager) = setup();
        let (transport, mut client) = MemoryTransport::pair();
        manager.connect(transport).await.unwrap();

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_heartbeat(
            Arc::clone(&manager),
            Duration::from_millis(20),
            Duration::from_secs(60),
            cancel.clone(),
        ));

        assert_eq!(client.next_types(4).await[3], "ping");
        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn heartbeat_closes_silent_sessions() {
        let (_backend, manager) = setup();
        let (transport, mut client) = MemoryTransport::pair();
        manager.connect(transport).await.unwrap();

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_heartbeat(
            Arc::clone(&manager),
            Duration::from_millis(20),
            Duration::from_millis(10),
            cancel.clone(),
        ));

        assert!(client.close_code().await.is_some());
        assert_eq!(manager.session_count().await, 0);
        cancel.cancel();
        task.await.unwrap();
    }
}
