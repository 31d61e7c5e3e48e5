//! HTTP adapters - REST API and middleware.
//!
//! - [`training`] - state reads and training control
//! - [`health`] - liveness and readiness
//! - [`middleware`] - API-key auth and rate limiting
//! - [`router`] - assembles everything into one `Router`

pub mod health;
pub mod middleware;
pub mod router;
pub mod training;

pub use health::{health_routes, HealthState};
pub use middleware::{security_middleware, SecurityState};
pub use router::{build_router, AppState};
pub use training::{training_routes, TrainingAppState};
