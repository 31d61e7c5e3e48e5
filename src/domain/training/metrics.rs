//! Per-epoch training metrics.

use serde::{Deserialize, Serialize};

use super::TrainingPhase;

/// One metrics sample, emitted once per simulated or remote epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsEntry {
    pub epoch: u64,
    pub step: u64,
    pub phase: TrainingPhase,
    pub train_loss: f64,
    pub train_accuracy: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub val_loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub val_accuracy: Option<f64>,
    pub hidden_units: u32,
    pub learning_rate: f64,
    pub timestamp: f64,
}

impl MetricsEntry {
    /// Returns true if this sample was produced after `other`.
    pub fn is_newer_than(&self, other: &MetricsEntry) -> bool {
        (self.epoch, self.step) > (other.epoch, other.step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(epoch: u64, step: u64) -> MetricsEntry {
        MetricsEntry {
            epoch,
            step,
            phase: TrainingPhase::Output,
            train_loss: 0.5,
            train_accuracy: 0.5,
            val_loss: None,
            val_accuracy: None,
            hidden_units: 0,
            learning_rate: 0.01,
            timestamp: 0.0,
        }
    }

    #[test]
    fn newer_compares_epoch_then_step() {
        assert!(entry(2, 0).is_newer_than(&entry(1, 9)));
        assert!(entry(1, 3).is_newer_than(&entry(1, 2)));
        assert!(!entry(1, 2).is_newer_than(&entry(1, 2)));
    }

    #[test]
    fn missing_validation_fields_are_omitted() {
        let json = serde_json::to_value(entry(1, 1)).unwrap();
        assert!(json.get("val_loss").is_none());
        let parsed: MetricsEntry = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.val_accuracy, None);
    }
}
