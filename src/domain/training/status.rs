//! Training status and phase enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of the training run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrainingStatus {
    #[default]
    Stopped,
    Started,
    Paused,
}

impl TrainingStatus {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingStatus::Stopped => "stopped",
            TrainingStatus::Started => "started",
            TrainingStatus::Paused => "paused",
        }
    }

    /// Training counts as active while started or paused.
    pub fn is_active(&self) -> bool {
        matches!(self, TrainingStatus::Started | TrainingStatus::Paused)
    }

    /// Validates a transition from this status to another.
    ///
    /// Valid transitions:
    /// - Stopped -> Started
    /// - Started -> Paused | Stopped
    /// - Paused -> Started | Stopped
    pub fn can_transition_to(&self, target: &TrainingStatus) -> bool {
        use TrainingStatus::*;
        matches!(
            (self, target),
            (Stopped, Started)
                | (Started, Paused)
                | (Started, Stopped)
                | (Paused, Started)
                | (Paused, Stopped)
        )
    }
}

impl fmt::Display for TrainingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which part of the cascade-correlation cycle is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrainingPhase {
    #[default]
    Idle,
    /// Output weights are being trained.
    Output,
    /// Candidate units are being trained for installation.
    Candidate,
    Inference,
}

impl TrainingPhase {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingPhase::Idle => "idle",
            TrainingPhase::Output => "output",
            TrainingPhase::Candidate => "candidate",
            TrainingPhase::Inference => "inference",
        }
    }

    /// Parses a phase name reported by a remote service.
    ///
    /// Unknown names collapse to `Idle` so a newer service cannot push an
    /// out-of-range phase to dashboard clients.
    pub fn from_wire(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "output" => TrainingPhase::Output,
            "candidate" => TrainingPhase::Candidate,
            "inference" => TrainingPhase::Inference,
            _ => TrainingPhase::Idle,
        }
    }
}

impl fmt::Display for TrainingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_status_is_stopped() {
        assert_eq!(TrainingStatus::default(), TrainingStatus::Stopped);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&TrainingStatus::Paused).unwrap();
        assert_eq!(json, "\"paused\"");
    }

    #[test]
    fn active_statuses() {
        assert!(!TrainingStatus::Stopped.is_active());
        assert!(TrainingStatus::Started.is_active());
        assert!(TrainingStatus::Paused.is_active());
    }

    #[test]
    fn stopped_cannot_pause() {
        assert!(!TrainingStatus::Stopped.can_transition_to(&TrainingStatus::Paused));
    }

    #[test]
    fn paused_can_resume_or_stop() {
        assert!(TrainingStatus::Paused.can_transition_to(&TrainingStatus::Started));
        assert!(TrainingStatus::Paused.can_transition_to(&TrainingStatus::Stopped));
    }

    #[test]
    fn phase_serializes_lowercase() {
        let json = serde_json::to_string(&TrainingPhase::Candidate).unwrap();
        assert_eq!(json, "\"candidate\"");
    }

    #[test]
    fn unknown_phase_collapses_to_idle() {
        assert_eq!(TrainingPhase::from_wire("warmup"), TrainingPhase::Idle);
        assert_eq!(TrainingPhase::from_wire("OUTPUT"), TrainingPhase::Output);
    }
}
