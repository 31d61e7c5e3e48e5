//! Training parameters accepted by `start_training` and `apply_params`.

use serde::{Deserialize, Serialize};

use super::BackendError;

/// Upper bound on hidden units a client may request.
pub const MAX_HIDDEN_UNITS_LIMIT: u32 = 1000;

/// Optional overrides for a training run. Absent fields keep their
/// current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_hidden_units: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_epochs: Option<u64>,
}

impl TrainingParams {
    pub fn is_empty(&self) -> bool {
        self.learning_rate.is_none() && self.max_hidden_units.is_none() && self.max_epochs.is_none()
    }

    /// Rejects non-finite or out-of-range values.
    pub fn validate(&self) -> Result<(), BackendError> {
        if let Some(lr) = self.learning_rate {
            if !lr.is_finite() || lr <= 0.0 || lr > 10.0 {
                return Err(BackendError::InvalidParams(format!(
                    "learning_rate must be in (0, 10], got {}",
                    lr
                )));
            }
        }
        if let Some(units) = self.max_hidden_units {
            if units > MAX_HIDDEN_UNITS_LIMIT {
                return Err(BackendError::InvalidParams(format!(
                    "max_hidden_units must be at most {}, got {}",
                    MAX_HIDDEN_UNITS_LIMIT, units
                )));
            }
        }
        if self.max_epochs == Some(0) {
            return Err(BackendError::InvalidParams(
                "max_epochs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_params_are_valid() {
        let params = TrainingParams::default();
        assert!(params.is_empty());
        assert!(params.validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_learning_rate() {
        let params = TrainingParams {
            learning_rate: Some(0.0),
            ..Default::default()
        };
        assert!(matches!(params.validate(), Err(BackendError::InvalidParams(_))));
    }

    #[test]
    fn rejects_nan_learning_rate() {
        let params = TrainingParams {
            learning_rate: Some(f64::NAN),
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn rejects_excessive_hidden_units() {
        let params = TrainingParams {
            max_hidden_units: Some(MAX_HIDDEN_UNITS_LIMIT + 1),
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn rejects_zero_epochs() {
        let params = TrainingParams {
            max_epochs: Some(0),
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn deserializes_partial_json() {
        let params: TrainingParams = serde_json::from_str(r#"{"learning_rate": 0.1}"#).unwrap();
        assert_eq!(params.learning_rate, Some(0.1));
        assert_eq!(params.max_epochs, None);
    }
}
