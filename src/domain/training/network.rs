//! Network, dataset and decision-boundary introspection types.

use serde::{Deserialize, Serialize};

/// Structure of the cascade network: inputs, installed hidden units, outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkTopology {
    pub input_units: u32,
    pub output_units: u32,
    pub hidden_units: Vec<HiddenUnit>,
    pub connections: Vec<Connection>,
}

impl NetworkTopology {
    pub fn hidden_count(&self) -> u32 {
        self.hidden_units.len() as u32
    }

    pub fn weights(&self) -> impl Iterator<Item = f64> + '_ {
        self.connections.iter().map(|c| c.weight)
    }
}

/// An installed hidden unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiddenUnit {
    pub id: u32,
    pub activation: String,
}

/// A weighted edge. Node names are `input_N`, `hidden_N`, `output_N` or `bias`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub from: String,
    pub to: String,
    pub weight: f64,
}

/// Weight statistics for the current network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub input_units: u32,
    pub hidden_units: u32,
    pub output_units: u32,
    pub total_weights: u64,
    pub weight_mean: f64,
    pub weight_std: f64,
    pub weight_min: f64,
    pub weight_max: f64,
}

impl NetworkStats {
    /// Computes statistics from a topology. Empty weight sets yield zeros.
    pub fn from_topology(topology: &NetworkTopology) -> Self {
        let weights: Vec<f64> = topology.weights().collect();
        let mut stats = Self {
            input_units: topology.input_units,
            hidden_units: topology.hidden_count(),
            output_units: topology.output_units,
            total_weights: weights.len() as u64,
            ..Self::default()
        };
        if weights.is_empty() {
            return stats;
        }

        let n = weights.len() as f64;
        let mean = weights.iter().sum::<f64>() / n;
        let variance = weights.iter().map(|w| (w - mean).powi(2)).sum::<f64>() / n;
        stats.weight_mean = mean;
        stats.weight_std = variance.sqrt();
        stats.weight_min = weights.iter().copied().fold(f64::INFINITY, f64::min);
        stats.weight_max = weights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        stats
    }
}

/// Dataset the network is trained on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub name: String,
    pub num_samples: usize,
    pub num_features: usize,
    pub num_classes: usize,
    pub inputs: Vec<Vec<f64>>,
    pub targets: Vec<u32>,
}

/// Network output sampled over a square grid covering the input space.
///
/// `values` is row-major: `values[row][col]` is the output at
/// `(x_min + col * dx, y_min + row * dy)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionBoundary {
    pub resolution: usize,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub values: Vec<Vec<f64>>,
}
