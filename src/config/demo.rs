//! Demo simulator configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Tuning for the in-process training simulator
#[derive(Debug, Clone, Deserialize)]
pub struct DemoConfig {
    /// Milliseconds between simulated epochs
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Output-phase epochs before a candidate phase begins
    #[serde(default = "default_epochs_per_phase")]
    pub epochs_per_phase: u64,

    /// Epochs spent training candidates before one is installed
    #[serde(default = "default_candidate_epochs")]
    pub candidate_epochs: u64,

    #[serde(default = "default_max_hidden_units")]
    pub max_hidden_units: u32,

    #[serde(default = "default_max_epochs")]
    pub max_epochs: u64,

    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    /// Points in the generated two-spiral dataset
    #[serde(default = "default_dataset_samples")]
    pub dataset_samples: usize,

    /// Seed for the simulator's random number generator
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl DemoConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Validate demo configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.tick_ms == 0 {
            return Err(ValidationError::InvalidDemo("tick_ms must be positive"));
        }
        if self.epochs_per_phase == 0 || self.candidate_epochs == 0 {
            return Err(ValidationError::InvalidDemo("phase lengths must be positive"));
        }
        if self.max_epochs == 0 {
            return Err(ValidationError::InvalidDemo("max_epochs must be positive"));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(ValidationError::InvalidDemo("learning_rate must be positive"));
        }
        if self.dataset_samples < 2 {
            return Err(ValidationError::InvalidDemo("dataset needs at least two samples"));
        }
        Ok(())
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            epochs_per_phase: default_epochs_per_phase(),
            candidate_epochs: default_candidate_epochs(),
            max_hidden_units: default_max_hidden_units(),
            max_epochs: default_max_epochs(),
            learning_rate: default_learning_rate(),
            dataset_samples: default_dataset_samples(),
            seed: default_seed(),
        }
    }
}

fn default_tick_ms() -> u64 {
    100
}

fn default_epochs_per_phase() -> u64 {
    25
}

fn default_candidate_epochs() -> u64 {
    5
}

fn default_max_hidden_units() -> u32 {
    10
}

fn default_max_epochs() -> u64 {
    1000
}

fn default_learning_rate() -> f64 {
    0.01
}

fn default_dataset_samples() -> usize {
    200
}

fn default_seed() -> u64 {
    42
}
