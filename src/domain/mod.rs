//! Domain layer - value types with no I/O.

pub mod foundation;
pub mod training;
