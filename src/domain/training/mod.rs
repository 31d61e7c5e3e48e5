//! Training domain - value types exchanged with training backends.
//!
//! - [`TrainingStatus`] / [`TrainingPhase`] - lifecycle enums
//! - [`TrainingStateSnapshot`] - what dashboard clients render
//! - [`MetricsEntry`] - per-epoch samples
//! - [`NetworkTopology`], [`NetworkStats`], [`DatasetInfo`], [`DecisionBoundary`]
//! - [`BackendError`] / [`BackendResult`] - declared operation outcomes

mod errors;
mod kind;
mod metrics;
mod network;
mod params;
mod snapshot;
mod status;

pub use errors::{BackendError, BackendResult, ControlAck};
pub use kind::BackendKind;
pub use metrics::MetricsEntry;
pub use network::{
    Connection, DatasetInfo, DecisionBoundary, HiddenUnit, NetworkStats, NetworkTopology,
};
pub use params::{TrainingParams, MAX_HIDDEN_UNITS_LIMIT};
pub use snapshot::{StatusSummary, TrainingStateSnapshot};
pub use status::{TrainingPhase, TrainingStatus};
