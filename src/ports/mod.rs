//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `TrainingBackend` - Training source (demo simulator or remote service)
//! - `SessionTransport` - Write half of a dashboard client connection
//! - `RateLimiter` - Per-caller request budgets for the security middleware

mod rate_limiter;
mod session_transport;
mod training_backend;

pub use rate_limiter::{
    RateLimitDenied, RateLimitError, RateLimitKey, RateLimitResult, RateLimitScope,
    RateLimitStatus, RateLimiter,
};
pub use session_transport::{SessionTransport, TransportError};
pub use training_backend::{unsupported, TrainingBackend};
