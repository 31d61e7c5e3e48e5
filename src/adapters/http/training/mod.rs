//! Training HTTP adapter module.
//!
//! REST endpoints for reading training state and driving the backend.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::{ControlResponse, ErrorResponse};
pub use handlers::{TrainingApiError, TrainingAppState};
pub use routes::training_routes;
