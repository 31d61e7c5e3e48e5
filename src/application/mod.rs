//! Application layer - runtime wiring between adapters.

pub mod runtime;

pub use runtime::TrainingRuntime;
