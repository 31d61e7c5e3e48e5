//! Connection manager for training-stream sessions.
//!
//! Owns every live session and fans out messages to them.
//!
//! # Architecture
//!
//! ```text
//!            broadcast()
//!                 │  serialize once
//!       ┌─────────┼─────────┐
//!       ▼         ▼         ▼
//!   [queue a] [queue b] [queue c]     bounded mpsc per session
//!       │         │         │
//!   writer a  writer b  writer c      one task per session
//!       │         │         │
//!   transport transport transport
//! ```
//!
//! Each session gets a bounded queue drained by its own writer task, so
//! frames reach a session in the order they were enqueued and a slow client
//! never stalls the others. A session whose queue is full or whose writer
//! has failed is deregistered.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::messages::ServerMessage;
use crate::config::WebSocketConfig;
use crate::domain::foundation::{SessionId, Timestamp};
use crate::domain::training::{StatusSummary, TrainingStateSnapshot};
use crate::ports::{SessionTransport, TrainingBackend};

/// Close code sent when the server is at capacity ("try again later").
pub const CLOSE_TRY_AGAIN_LATER: u16 = 1013;
/// Close code sent when a session is closed by the server.
pub const CLOSE_GOING_AWAY: u16 = 1001;

/// Frames the handshake needs queued at once.
const HANDSHAKE_FRAMES: usize = 3;
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Failure registering a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("connection limit reached ({max} sessions)")]
    CapacityExceeded { max: usize },

    #[error("failed to encode handshake: {0}")]
    Encode(String),
}

/// What a session is subscribed to. Only the training stream exists today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionScope {
    Training,
}

/// Public view of one session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub scope: SubscriptionScope,
    pub connected_at: Timestamp,
}

/// Counts reported by `GET /api/connections`.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStats {
    pub active: usize,
    pub max: usize,
    pub sessions: Vec<SessionInfo>,
}

struct SessionHandle {
    tx: mpsc::Sender<Arc<str>>,
    closed: CancellationToken,
    scope: SubscriptionScope,
    connected_at: Timestamp,
    /// Milliseconds since manager start when the client was last heard from.
    last_seen: AtomicU64,
    writer: JoinHandle<()>,
}

type SessionMap = Arc<RwLock<HashMap<SessionId, SessionHandle>>>;

/// Registry of live sessions with broadcast fan-out.
pub struct ConnectionManager {
    sessions: SessionMap,
    backend: Arc<dyn TrainingBackend>,
    max_sessions: usize,
    queue_capacity: usize,
    heartbeat_interval_secs: u64,
    started: Instant,
    shutdown: CancellationToken,
    /// Sessions ever registered; lets the relay notice new arrivals.
    joined: AtomicU64,
}

impl ConnectionManager {
    pub fn new(backend: Arc<dyn TrainingBackend>, config: &WebSocketConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            backend,
            max_sessions: config.max_connections,
            queue_capacity: config.send_queue_capacity.max(HANDSHAKE_FRAMES + 1),
            heartbeat_interval_secs: config.heartbeat_interval_secs,
            started: Instant::now(),
            shutdown: CancellationToken::new(),
            joined: AtomicU64::new(0),
        }
    }

    pub fn backend(&self) -> &Arc<dyn TrainingBackend> {
        &self.backend
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    /// Total sessions registered since start. Grows on every connect.
    ///
    /// A session's handshake snapshot is read before it is registered, so a
    /// broadcast can slip in between; the relay resends state when this
    /// changes.
    pub fn joined_count(&self) -> u64 {
        self.joined.load(Ordering::Acquire)
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn has_capacity(&self) -> bool {
        !self.shutdown.is_cancelled() && self.session_count().await < self.max_sessions
    }

    pub async fn stats(&self) -> ConnectionStats {
        let sessions = self.sessions.read().await;
        ConnectionStats {
            active: sessions.len(),
            max: self.max_sessions,
            sessions: sessions
                .iter()
                .map(|(id, handle)| SessionInfo {
                    id: *id,
                    scope: handle.scope,
                    connected_at: handle.connected_at,
                })
                .collect(),
        }
    }

    /// Registers a session and queues the handshake.
    ///
    /// The handshake is `connection_established`, `initial_status`, `state`,
    /// queued before the session becomes visible to [`broadcast`], so no
    /// broadcast can overtake it. On rejection the transport is closed with
    /// [`CLOSE_TRY_AGAIN_LATER`] and nothing else is sent.
    ///
    /// [`broadcast`]: ConnectionManager::broadcast
    pub async fn connect<T: SessionTransport>(
        &self,
        mut transport: T,
    ) -> Result<SessionId, ConnectError> {
        if !self.has_capacity().await {
            return Err(self.reject(&mut transport).await);
        }

        let (snapshot, summary) = self.initial_status().await;

        let mut sessions = self.sessions.write().await;
        if self.shutdown.is_cancelled() || sessions.len() >= self.max_sessions {
            drop(sessions);
            return Err(self.reject(&mut transport).await);
        }

        let id = SessionId::new();
        let handshake = [
            ServerMessage::connection_established(
                id,
                self.heartbeat_interval_secs,
                sessions.len() + 1,
            ),
            ServerMessage::initial_status(summary),
            ServerMessage::state(snapshot),
        ];
        let frames = handshake
            .iter()
            .map(encode)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ConnectError::Encode(e.to_string()))?;

        let (tx, rx) = mpsc::channel(self.queue_capacity);
        for frame in frames {
            // Fresh queue is larger than the handshake.
            let _ = tx.try_send(frame);
        }

        let closed = self.shutdown.child_token();
        let writer = tokio::spawn(write_loop(
            id,
            rx,
            transport,
            closed.clone(),
            Arc::clone(&self.sessions),
        ));

        sessions.insert(
            id,
            SessionHandle {
                tx,
                closed,
                scope: SubscriptionScope::Training,
                connected_at: Timestamp::now(),
                last_seen: AtomicU64::new(self.elapsed_ms()),
                writer,
            },
        );
        self.joined.fetch_add(1, Ordering::AcqRel);
        let count = sessions.len();
        drop(sessions);

        tracing::info!(session_id = %id, sessions = count, "WebSocket session connected");
        Ok(id)
    }

    async fn reject<T: SessionTransport>(&self, transport: &mut T) -> ConnectError {
        tracing::warn!(max = self.max_sessions, "Rejecting WebSocket session, at capacity");
        transport
            .close(CLOSE_TRY_AGAIN_LATER, "server at connection capacity")
            .await;
        ConnectError::CapacityExceeded {
            max: self.max_sessions,
        }
    }

    /// Status summary and snapshot for a new session. Backend failures
    /// degrade to an idle snapshot.
    async fn initial_status(&self) -> (TrainingStateSnapshot, StatusSummary) {
        let snapshot = match self.backend.get_status().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "Backend status unavailable for handshake");
                TrainingStateSnapshot::idle()
            }
        };
        let latest = self.backend.get_metrics().await.ok().flatten();
        let summary = StatusSummary::from_snapshot(
            self.backend.backend_type(),
            &snapshot,
            self.backend.has_network().await,
            latest,
        );
        (snapshot, summary)
    }

    /// Queues a message for every session. Returns how many accepted it.
    ///
    /// Sessions that cannot accept the frame are deregistered; delivery to
    /// the rest continues.
    pub async fn broadcast(&self, message: &ServerMessage) -> usize {
        let frame = match encode(message) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, kind = message.type_name(), "Failed to encode broadcast");
                return 0;
            }
        };

        let mut delivered = 0;
        let mut failed = Vec::new();
        {
            let sessions = self.sessions.read().await;
            for (id, handle) in sessions.iter() {
                match handle.tx.try_send(Arc::clone(&frame)) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        tracing::warn!(session_id = %id, "Session send queue full, dropping session");
                        failed.push(*id);
                    }
                    Err(TrySendError::Closed(_)) => failed.push(*id),
                }
            }
        }

        for id in failed {
            self.disconnect(id).await;
        }

        tracing::trace!(kind = message.type_name(), delivered, "Broadcast queued");
        delivered
    }

    /// Queues a message for one session. Returns false if the session is
    /// gone or could not accept it.
    pub async fn send_to(&self, id: SessionId, message: &ServerMessage) -> bool {
        let frame = match encode(message) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, kind = message.type_name(), "Failed to encode message");
                return false;
            }
        };

        let sent = match self.sessions.read().await.get(&id) {
            Some(handle) => handle.tx.try_send(frame).is_ok(),
            None => return false,
        };
        if !sent {
            self.disconnect(id).await;
        }
        sent
    }

    /// Removes a session and closes its transport. Safe to call repeatedly;
    /// returns whether the session was still registered.
    pub async fn disconnect(&self, id: SessionId) -> bool {
        let removed = self.sessions.write().await.remove(&id);
        match removed {
            Some(handle) => {
                handle.closed.cancel();
                tracing::info!(session_id = %id, "WebSocket session disconnected");
                true
            }
            None => false,
        }
    }

    /// Records that the client was heard from.
    pub async fn touch(&self, id: SessionId) {
        if let Some(handle) = self.sessions.read().await.get(&id) {
            handle.last_seen.store(self.elapsed_ms(), Ordering::Relaxed);
        }
    }

    /// Token cancelled when the session is closed by the server.
    pub async fn closed_signal(&self, id: SessionId) -> Option<CancellationToken> {
        self.sessions
            .read()
            .await
            .get(&id)
            .map(|handle| handle.closed.clone())
    }

    /// Closes sessions silent for longer than `stale_after`. Returns how
    /// many were closed.
    pub async fn reap_stale(&self, stale_after: Duration) -> usize {
        let now = self.elapsed_ms();
        let limit = stale_after.as_millis() as u64;
        let stale: Vec<SessionId> = self
            .sessions
            .read()
            .await
            .iter()
            .filter(|(_, handle)| {
                now.saturating_sub(handle.last_seen.load(Ordering::Relaxed)) > limit
            })
            .map(|(id, _)| *id)
            .collect();

        for id in &stale {
            tracing::info!(session_id = %id, "Closing stale WebSocket session");
            self.disconnect(*id).await;
        }
        stale.len()
    }

    /// Refuses new sessions, closes every open one and waits for their
    /// writers to finish.
    pub async fn close_all(&self) {
        self.shutdown.cancel();
        let drained: Vec<(SessionId, SessionHandle)> =
            self.sessions.write().await.drain().collect();
        let count = drained.len();

        for (_, handle) in drained {
            handle.closed.cancel();
            if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, handle.writer)
                .await
                .is_err()
            {
                tracing::warn!("WebSocket writer did not finish in time");
            }
        }

        tracing::info!(sessions = count, "All WebSocket sessions closed");
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

fn encode(message: &ServerMessage) -> Result<Arc<str>, serde_json::Error> {
    message.to_json().map(Arc::from)
}

/// Drains one session's queue into its transport.
async fn write_loop<T: SessionTransport>(
    id: SessionId,
    mut rx: mpsc::Receiver<Arc<str>>,
    mut transport: T,
    closed: CancellationToken,
    sessions: SessionMap,
) {
    loop {
        let frame = tokio::select! {
            biased;
            _ = closed.cancelled() => break,
            next = rx.recv() => match next {
                Some(frame) => frame,
                None => break,
            },
        };

        let result = tokio::select! {
            biased;
            _ = closed.cancelled() => break,
            result = transport.send_text(&frame) => result,
        };
        if let Err(e) = result {
            tracing::debug!(session_id = %id, error = %e, "Send failed, dropping session");
            break;
        }
    }

    if sessions.write().await.remove(&id).is_some() {
        tracing::info!(session_id = %id, "WebSocket session disconnected");
    }
    transport.close(CLOSE_GOING_AWAY, "session closed").await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::backend::DemoBackend;
    use crate::adapters::websocket::memory::MemoryTransport;
    use crate::config::DemoConfig;

    fn manager(max: usize) -> ConnectionManager {
        let backend: Arc<dyn TrainingBackend> = Arc::new(DemoBackend::new(DemoConfig::default()));
        let config = WebSocketConfig {
            max_connections: max,
            send_queue_capacity: 8,
            ..Default::default()
        };
        ConnectionManager::new(backend, &config)
    }

    #[tokio::test]
    async fn handshake_is_three_messages_in_order() {
        let manager = manager(4);
        let (transport, mut client) = MemoryTransport::pair();
        manager.connect(transport).await.unwrap();

        let types: Vec<String> = client.next_types(3).await;
        assert_eq!(types, ["connection_established", "initial_status", "state"]);
    }

    #[tokio::test]
    async fn connect_beyond_capacity_is_rejected_without_messages() {
        let manager = manager(1);
        let (first, _keep) = MemoryTransport::pair();
        manager.connect(first).await.unwrap();

        let (second, mut client) = MemoryTransport::pair();
        let result = manager.connect(second).await;
        assert_eq!(result, Err(ConnectError::CapacityExceeded { max: 1 }));
        assert_eq!(client.close_code().await, Some(CLOSE_TRY_AGAIN_LATER));
        assert!(client.received().await.is_empty());
    }

    #[tokio::test]
    async fn broadcast_reaches_every_session_in_order() {
        let manager = manager(4);
        let (a, mut client_a) = MemoryTransport::pair();
        let (b, mut client_b) = MemoryTransport::pair();
        manager.connect(a).await.unwrap();
        manager.connect(b).await.unwrap();

        assert_eq!(manager.broadcast(&ServerMessage::ping()).await, 2);
        assert_eq!(
            manager.broadcast(&ServerMessage::error("X", "second")).await,
            2
        );

        for client in [&mut client_a, &mut client_b] {
            let types = client.next_types(5).await;
            assert_eq!(&types[3..], ["ping", "error"]);
        }
    }

    #[tokio::test]
    async fn failed_session_is_dropped_without_affecting_others() {
        let manager = manager(4);
        let (good, mut good_client) = MemoryTransport::pair();
        let (bad, bad_client) = MemoryTransport::pair();
        manager.connect(good).await.unwrap();
        manager.connect(bad).await.unwrap();

        drop(bad_client);
        // Writer notices the dead peer on its next write.
        for _ in 0..3 {
            manager.broadcast(&ServerMessage::ping()).await;
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(manager.session_count().await, 1);
        let types = good_client.next_types(6).await;
        assert_eq!(&types[3..], ["ping", "ping", "ping"]);
    }

    #[tokio::test]
    async fn full_queue_drops_slow_session() {
        let manager = manager(4);
        let (transport, _client) = MemoryTransport::stalled();
        manager.connect(transport).await.unwrap();

        for _ in 0..20 {
            manager.broadcast(&ServerMessage::ping()).await;
        }
        assert_eq!(manager.session_count().await, 0);
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let manager = manager(4);
        let (transport, mut client) = MemoryTransport::pair();
        let id = manager.connect(transport).await.unwrap();

        assert!(manager.disconnect(id).await);
        assert!(!manager.disconnect(id).await);
        assert_eq!(manager.session_count().await, 0);
        assert_eq!(client.close_code().await, Some(CLOSE_GOING_AWAY));
    }

    #[tokio::test]
    async fn send_to_targets_one_session() {
        let manager = manager(4);
        let (a, mut client_a) = MemoryTransport::pair();
        let (b, mut client_b) = MemoryTransport::pair();
        let id_a = manager.connect(a).await.unwrap();
        manager.connect(b).await.unwrap();

        assert!(manager.send_to(id_a, &ServerMessage::pong()).await);
        manager.broadcast(&ServerMessage::ping()).await;

        assert_eq!(&client_a.next_types(5).await[3..], ["pong", "ping"]);
        assert_eq!(&client_b.next_types(4).await[3..], ["ping"]);
    }

    #[tokio::test]
    async fn send_to_unknown_session_fails() {
        let manager = manager(4);
        assert!(!manager.send_to(SessionId::new(), &ServerMessage::pong()).await);
    }

    #[tokio::test]
    async fn stale_sessions_are_reaped() {
        let manager = manager(4);
        let (quiet, mut quiet_client) = MemoryTransport::pair();
        let (chatty, _chatty_client) = MemoryTransport::pair();
        manager.connect(quiet).await.unwrap();
        let chatty_id = manager.connect(chatty).await.unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;
        manager.touch(chatty_id).await;

        assert_eq!(manager.reap_stale(Duration::from_millis(30)).await, 1);
        assert_eq!(manager.session_count().await, 1);
        assert_eq!(quiet_client.close_code().await, Some(CLOSE_GOING_AWAY));
    }

    #[tokio::test]
    async fn close_all_closes_sessions_and_refuses_new_ones() {
        let manager = manager(4);
        let (transport, mut client) = MemoryTransport::pair();
        manager.connect(transport).await.unwrap();

        manager.close_all().await;
        assert_eq!(manager.session_count().await, 0);
        assert_eq!(client.close_code().await, Some(CLOSE_GOING_AWAY));

        let (late, _late_client) = MemoryTransport::pair();
        assert!(manager.connect(late).await.is_err());
    }

    #[tokio::test]
    async fn stats_report_sessions() {
        let manager = manager(3);
        let (transport, _client) = MemoryTransport::pair();
        let id = manager.connect(transport).await.unwrap();

        let stats = manager.stats().await;
        assert_eq!(stats.active, 1);
        assert_eq!(stats.max, 3);
        assert_eq!(stats.sessions[0].id, id);
        assert_eq!(stats.sessions[0].scope, SubscriptionScope::Training);
    }
}
