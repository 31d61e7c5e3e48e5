//! Cascade-correlation training simulator behind the demo backend.
//!
//! The simulator does not learn anything. It produces plausible training
//! dynamics: output phases in which loss decays toward a floor, candidate
//! phases that end by installing a hidden unit, and a floor that drops with
//! every installed unit. All randomness comes from a seeded `StdRng`, so a
//! given config always yields the same run.

use std::collections::VecDeque;
use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::DemoConfig;
use crate::domain::foundation::Timestamp;
use crate::domain::training::{
    Connection, DatasetInfo, DecisionBoundary, HiddenUnit, MetricsEntry, NetworkTopology,
    TrainingParams, TrainingPhase, TrainingStatus, TrainingStateSnapshot,
};

/// Entries kept in the metrics history ring.
pub const HISTORY_CAPACITY: usize = 10_000;

pub const NETWORK_NAME: &str = "cascor-demo";
pub const DATASET_NAME: &str = "two_spiral";
pub const THRESHOLD_FUNCTION: &str = "sigmoid";
pub const OPTIMIZER_NAME: &str = "quickprop";

const INPUT_UNITS: usize = 2;
const BATCH_SIZE: usize = 32;
const INITIAL_LOSS: f64 = 0.7;
const GRID_EXTENT: f64 = 1.2;
const MIN_RESOLUTION: usize = 2;
const MAX_RESOLUTION: usize = 200;

/// Weights of the simulated network.
///
/// Activations are laid out as `[inputs.., bias, hidden_0, hidden_1, ..]`;
/// hidden unit `i` reads the first `INPUT_UNITS + 1 + i` of them.
#[derive(Debug, Clone)]
pub struct SimNetwork {
    hidden: Vec<Vec<f64>>,
    output_weights: Vec<f64>,
}

impl SimNetwork {
    fn new(rng: &mut StdRng) -> Self {
        Self {
            hidden: Vec::new(),
            output_weights: random_weights(rng, INPUT_UNITS + 1),
        }
    }

    fn install_unit(&mut self, rng: &mut StdRng) {
        let fan_in = INPUT_UNITS + 1 + self.hidden.len();
        self.hidden.push(random_weights(rng, fan_in));
        self.output_weights.push(rng.gen_range(-1.0..1.0));
    }

    pub fn hidden_count(&self) -> u32 {
        self.hidden.len() as u32
    }

    /// Network output for one input point.
    pub fn evaluate(&self, x: f64, y: f64) -> f64 {
        let mut activations = Vec::with_capacity(INPUT_UNITS + 1 + self.hidden.len());
        activations.extend_from_slice(&[x, y, 1.0]);
        for weights in &self.hidden {
            let sum = dot(weights, &activations);
            activations.push(sum.tanh());
        }
        sigmoid(dot(&self.output_weights, &activations))
    }

    /// Samples the output over a square grid. CPU-bound; callers run this
    /// off the async executor.
    pub fn decision_boundary(&self, resolution: usize) -> DecisionBoundary {
        let resolution = resolution.clamp(MIN_RESOLUTION, MAX_RESOLUTION);
        let step = 2.0 * GRID_EXTENT / (resolution - 1) as f64;
        let values = (0..resolution)
            .map(|row| {
                let y = -GRID_EXTENT + row as f64 * step;
                (0..resolution)
                    .map(|col| self.evaluate(-GRID_EXTENT + col as f64 * step, y))
                    .collect()
            })
            .collect();

        DecisionBoundary {
            resolution,
            x_range: (-GRID_EXTENT, GRID_EXTENT),
            y_range: (-GRID_EXTENT, GRID_EXTENT),
            values,
        }
    }

    pub fn topology(&self) -> NetworkTopology {
        let mut connections = Vec::new();
        for (unit, weights) in self.hidden.iter().enumerate() {
            let to = format!("hidden_{}", unit);
            connections.extend(weights.iter().enumerate().map(|(source, w)| Connection {
                from: source_name(source),
                to: to.clone(),
                weight: *w,
            }));
        }
        connections.extend(
            self.output_weights
                .iter()
                .enumerate()
                .map(|(source, w)| Connection {
                    from: source_name(source),
                    to: "output_0".to_string(),
                    weight: *w,
                }),
        );

        NetworkTopology {
            input_units: INPUT_UNITS as u32,
            output_units: 1,
            hidden_units: (0..self.hidden.len() as u32)
                .map(|id| HiddenUnit {
                    id,
                    activation: "tanh".to_string(),
                })
                .collect(),
            connections,
        }
    }
}

/// Mutable simulator state. Not thread-safe on its own; the demo backend
/// wraps it in a lock.
#[derive(Debug)]
pub struct CascadeSimulator {
    config: DemoConfig,
    rng: StdRng,
    dataset: DatasetInfo,
    network: Option<SimNetwork>,
    status: TrainingStatus,
    phase: TrainingPhase,
    epoch: u64,
    step: u64,
    epochs_in_phase: u64,
    learning_rate: f64,
    max_hidden_units: u32,
    max_epochs: u64,
    loss: f64,
    history: VecDeque<MetricsEntry>,
}

impl CascadeSimulator {
    /// Creates a simulator with a generated dataset and no network.
    pub fn new(config: DemoConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            dataset: two_spiral_dataset(config.dataset_samples),
            network: None,
            status: TrainingStatus::Stopped,
            phase: TrainingPhase::Idle,
            epoch: 0,
            step: 0,
            epochs_in_phase: 0,
            learning_rate: config.learning_rate,
            max_hidden_units: config.max_hidden_units,
            max_epochs: config.max_epochs,
            loss: INITIAL_LOSS,
            history: VecDeque::new(),
            config,
        }
    }

    pub fn has_network(&self) -> bool {
        self.network.is_some()
    }

    /// Creates a fresh network with no hidden units, replacing any existing one.
    pub fn create_network(&mut self) {
        self.network = Some(SimNetwork::new(&mut self.rng));
    }

    pub fn network(&self) -> Option<&SimNetwork> {
        self.network.as_ref()
    }

    pub fn dataset(&self) -> &DatasetInfo {
        &self.dataset
    }

    pub fn status(&self) -> TrainingStatus {
        self.status
    }

    pub fn set_status(&mut self, status: TrainingStatus) {
        self.status = status;
        if status == TrainingStatus::Stopped {
            self.phase = TrainingPhase::Idle;
        }
    }

    /// Begins (or restarts) a run. Caller has checked preconditions.
    pub fn begin(&mut self, reset: bool) {
        if reset || self.epoch >= self.max_epochs {
            self.reset_progress();
        }
        self.status = TrainingStatus::Started;
        self.phase = TrainingPhase::Output;
        self.epochs_in_phase = 0;
    }

    /// Clears progress and metrics and rebuilds the network without hidden units.
    pub fn reset_progress(&mut self) {
        self.status = TrainingStatus::Stopped;
        self.phase = TrainingPhase::Idle;
        self.epoch = 0;
        self.step = 0;
        self.epochs_in_phase = 0;
        self.loss = INITIAL_LOSS;
        self.history.clear();
        if self.network.is_some() {
            self.create_network();
        }
    }

    pub fn apply_params(&mut self, params: &TrainingParams) {
        if let Some(lr) = params.learning_rate {
            self.learning_rate = lr;
        }
        if let Some(units) = params.max_hidden_units {
            self.max_hidden_units = units;
        }
        if let Some(epochs) = params.max_epochs {
            self.max_epochs = epochs;
        }
    }

    /// Advances one epoch if training is running.
    ///
    /// Returns the metrics sample for the epoch, or `None` when nothing ran.
    pub fn step_epoch(&mut self) -> Option<MetricsEntry> {
        if self.status != TrainingStatus::Started {
            return None;
        }
        let network = self.network.as_mut()?;

        self.epoch += 1;
        self.step += self.dataset.num_samples.div_ceil(BATCH_SIZE) as u64;
        self.epochs_in_phase += 1;

        let phase = self.phase;
        if phase == TrainingPhase::Output {
            let floor = 0.02 + 0.45 * 0.75f64.powi(network.hidden.len() as i32);
            let rate = (self.learning_rate * 10.0).clamp(0.01, 0.5);
            let noise = self.rng.gen_range(-0.005..0.005);
            self.loss = (floor + (self.loss - floor) * (1.0 - rate) + noise).max(0.0);
            for weight in network.output_weights.iter_mut() {
                *weight += self.learning_rate * self.rng.gen_range(-1.0..1.0);
            }
        }

        let val_loss = self.loss * (1.0 + self.rng.gen_range(0.0..0.1));
        let entry = MetricsEntry {
            epoch: self.epoch,
            step: self.step,
            phase,
            train_loss: self.loss,
            train_accuracy: (1.0 - self.loss).clamp(0.0, 1.0),
            val_loss: Some(val_loss),
            val_accuracy: Some((1.0 - val_loss).clamp(0.0, 1.0)),
            hidden_units: network.hidden_count(),
            learning_rate: self.learning_rate,
            timestamp: Timestamp::now().as_unix_secs_f64(),
        };

        match phase {
            TrainingPhase::Output => {
                if self.epochs_in_phase >= self.config.epochs_per_phase
                    && network.hidden_count() < self.max_hidden_units
                {
                    self.phase = TrainingPhase::Candidate;
                    self.epochs_in_phase = 0;
                }
            }
            TrainingPhase::Candidate => {
                if self.epochs_in_phase >= self.config.candidate_epochs {
                    network.install_unit(&mut self.rng);
                    tracing::debug!(
                        hidden_units = network.hidden_count(),
                        epoch = self.epoch,
                        "Installed hidden unit"
                    );
                    self.phase = TrainingPhase::Output;
                    self.epochs_in_phase = 0;
                }
            }
            TrainingPhase::Idle | TrainingPhase::Inference => {
                self.phase = TrainingPhase::Output;
                self.epochs_in_phase = 0;
            }
        }

        if self.history.len() == HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(entry.clone());

        if self.epoch >= self.max_epochs {
            tracing::info!(epoch = self.epoch, "Demo training reached max epochs");
            self.set_status(TrainingStatus::Stopped);
        }

        Some(entry)
    }

    pub fn latest_metrics(&self) -> Option<MetricsEntry> {
        self.history.back().cloned()
    }

    /// The `count` most recent entries, oldest first.
    pub fn metrics_history(&self, count: usize) -> Vec<MetricsEntry> {
        let skip = self.history.len().saturating_sub(count);
        self.history.iter().skip(skip).cloned().collect()
    }

    pub fn snapshot(&self) -> TrainingStateSnapshot {
        let (network_name, threshold_function, optimizer_name) = if self.network.is_some() {
            (NETWORK_NAME, THRESHOLD_FUNCTION, OPTIMIZER_NAME)
        } else {
            ("", "", "")
        };

        TrainingStateSnapshot {
            status: self.status,
            phase: self.phase,
            learning_rate: self.learning_rate,
            max_hidden_units: self.max_hidden_units,
            max_epochs: self.max_epochs,
            current_epoch: self.epoch,
            current_step: self.step,
            network_name: network_name.to_string(),
            dataset_name: self.dataset.name.clone(),
            threshold_function: threshold_function.to_string(),
            optimizer_name: optimizer_name.to_string(),
            timestamp: Timestamp::now().as_unix_secs_f64(),
        }
    }
}

/// Two interleaved spirals, alternating class labels, in roughly [-1, 1]^2.
pub fn two_spiral_dataset(samples: usize) -> DatasetInfo {
    let per_class = samples.div_ceil(2).max(1) as f64;
    let mut inputs = Vec::with_capacity(samples);
    let mut targets = Vec::with_capacity(samples);

    for i in 0..samples {
        let class = (i % 2) as u32;
        let frac = (i / 2) as f64 / per_class;
        let radius = 0.1 + 0.9 * frac;
        let angle = 3.0 * PI * frac;
        let sign = if class == 0 { 1.0 } else { -1.0 };
        inputs.push(vec![sign * radius * angle.cos(), sign * radius * angle.sin()]);
        targets.push(class);
    }

    DatasetInfo {
        name: DATASET_NAME.to_string(),
        num_samples: samples,
        num_features: INPUT_UNITS,
        num_classes: 2,
        inputs,
        targets,
    }
}

fn source_name(index: usize) -> String {
    match index {
        i if i < INPUT_UNITS => format!("input_{}", i),
        i if i == INPUT_UNITS => "bias".to_string(),
        i => format!("hidden_{}", i - INPUT_UNITS - 1),
    }
}

fn random_weights(rng: &mut StdRng, n: usize) -> Vec<f64> {
    (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

fn dot(weights: &[f64], activations: &[f64]) -> f64 {
    weights.iter().zip(activations).map(|(w, a)| w * a).sum()
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
