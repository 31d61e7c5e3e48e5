//! WebSocket adapters for the real-time training stream.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     TrainingBackend (port)                          │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     │ polls
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        MetricsRelay                                 │
//! │   - interval tick or nudge from control handlers                    │
//! │   - broadcasts `state` on change, `metrics` on newer samples        │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     │ broadcasts
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     ConnectionManager                               │
//! │   session a ── queue ── writer      session b ── queue ── writer    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`messages`] - wire protocol types
//! - [`connections`] - session registry and fan-out
//! - [`handler`] - axum upgrade handler
//! - [`relay`] - metrics relay and heartbeat tasks
//! - [`memory`] - channel-backed transport

pub mod connections;
pub mod handler;
pub mod memory;
pub mod messages;
pub mod relay;

pub use connections::{
    ConnectError, ConnectionManager, ConnectionStats, SessionInfo, SubscriptionScope,
    CLOSE_GOING_AWAY, CLOSE_TRY_AGAIN_LATER,
};
pub use handler::{handle_client_text, websocket_router, ws_handler, WebSocketState, WEBSOCKET_PATH};
pub use memory::{Frame, MemoryClient, MemoryTransport};
pub use messages::{ClientMessage, ServerMessage, ServerPayload};
pub use relay::{run_heartbeat, MetricsRelay, RelayHandle, RelayOutcome};
