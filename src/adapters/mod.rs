//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `backend` - Training backends (demo simulator, remote service)
//! - `rate_limiter` - Fixed-window rate limiter
//! - `websocket` - Training stream sessions, relay and heartbeat
//! - `http` - REST routes, health checks and security middleware

pub mod backend;
pub mod http;
pub mod rate_limiter;
pub mod websocket;

pub use backend::{create_backend, select_backend, DemoBackend, SerializedBackend, ServiceBackend};
pub use rate_limiter::InMemoryRateLimiter;
