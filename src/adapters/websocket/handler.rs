//! WebSocket upgrade handler for the training stream.
//!
//! Handles the HTTP → WebSocket upgrade and the connection lifecycle:
//! 1. Refuse the upgrade with 503 when the manager is full
//! 2. Upgrade and register the session (handshake is queued by the manager)
//! 3. Answer client messages until disconnect or server close
//! 4. Deregister the session

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};

use super::connections::ConnectionManager;
use super::messages::{ClientMessage, ServerMessage};
use crate::domain::foundation::SessionId;
use crate::ports::{SessionTransport, TransportError};

/// Route of the training stream.
pub const WEBSOCKET_PATH: &str = "/ws/training";

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub manager: Arc<ConnectionManager>,
}

impl WebSocketState {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }
}

/// Write half of an axum socket.
struct SocketSink(SplitSink<WebSocket, Message>);

#[async_trait]
impl SessionTransport for SocketSink {
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        self.0
            .send(Message::Text(text.to_string()))
            .await
            .map_err(|e| TransportError::Write(e.to_string()))
    }

    async fn close(&mut self, code: u16, reason: &str) {
        let frame = CloseFrame {
            code,
            reason: Cow::Owned(reason.to_string()),
        };
        let _ = self.0.send(Message::Close(Some(frame))).await;
        let _ = self.0.close().await;
    }
}

/// Handle WebSocket upgrade requests.
///
/// Route: `GET /ws/training`
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WebSocketState>) -> Response {
    if !state.manager.has_capacity().await {
        tracing::warn!(
            max = state.manager.max_sessions(),
            "Refusing WebSocket upgrade, at capacity"
        );
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "detail": "WebSocket connection limit reached",
            })),
        )
            .into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state.manager))
}

/// Runs for the lifetime of an upgraded connection.
async fn handle_socket(socket: WebSocket, manager: Arc<ConnectionManager>) {
    let (sink, mut stream) = socket.split();

    // Capacity can be taken between the pre-upgrade check and here; the
    // manager then closes the socket with 1013.
    let id = match manager.connect(SocketSink(sink)).await {
        Ok(id) => id,
        Err(e) => {
            tracing::debug!(error = %e, "WebSocket session rejected after upgrade");
            return;
        }
    };
    let Some(closed) = manager.closed_signal(id).await else {
        return;
    };

    loop {
        let next = tokio::select! {
            _ = closed.cancelled() => break,
            next = stream.next() => next,
        };

        match next {
            Some(Ok(Message::Text(text))) => {
                manager.touch(id).await;
                handle_client_text(&manager, id, &text).await;
            }
            Some(Ok(Message::Binary(_))) => {
                manager.touch(id).await;
                tracing::warn!(session_id = %id, "Received unsupported binary message");
                let reply =
                    ServerMessage::error("UNSUPPORTED_MESSAGE", "binary frames are not supported");
                manager.send_to(id, &reply).await;
            }
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                manager.touch(id).await;
            }
            Some(Ok(Message::Close(_))) | None => {
                tracing::debug!(session_id = %id, "Client closed connection");
                break;
            }
            Some(Err(e)) => {
                tracing::debug!(session_id = %id, error = %e, "Receive error");
                break;
            }
        }
    }

    manager.disconnect(id).await;
}

/// Answers one client text message.
///
/// `ping` gets a `pong`, `request_state` gets a fresh `state`, `pong` only
/// counts as liveness. Anything else gets an `error` message.
pub async fn handle_client_text(manager: &ConnectionManager, id: SessionId, text: &str) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(session_id = %id, error = %e, "Unparseable client message");
            manager
                .send_to(id, &ServerMessage::error("INVALID_MESSAGE", e.to_string()))
                .await;
            return;
        }
    };

    match message {
        ClientMessage::Ping => {
            tracing::trace!(session_id = %id, "Received ping");
            manager.send_to(id, &ServerMessage::pong()).await;
        }
        ClientMessage::Pong => {
            tracing::trace!(session_id = %id, "Received pong");
        }
        ClientMessage::RequestState => {
            let reply = match manager.backend().get_status().await {
                Ok(snapshot) => ServerMessage::state(snapshot),
                Err(e) => ServerMessage::error(e.code(), e.to_string()),
            };
            manager.send_to(id, &reply).await;
        }
    }
}

/// Create axum router for the WebSocket endpoint.
pub fn websocket_router(state: WebSocketState) -> Router {
    Router::new()
        .route(WEBSOCKET_PATH, get(ws_handler))
        .with_state(state)
}
