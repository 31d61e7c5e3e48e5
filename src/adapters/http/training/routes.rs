//! HTTP routes for training endpoints.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{
    get_connections, get_dataset, get_decision_boundary, get_metrics, get_metrics_history,
    get_network_stats, get_state, get_status_summary, get_topology, pause_training,
    reset_training, resume_training, set_params, start_training, stop_training,
    TrainingAppState,
};

/// Creates the training router with all routes.
pub fn training_routes(state: TrainingAppState) -> Router {
    Router::new()
        .route("/api/state", get(get_state))
        .route("/api/status", get(get_status_summary))
        .route("/api/metrics", get(get_metrics))
        .route("/api/metrics/history", get(get_metrics_history))
        .route("/api/network/topology", get(get_topology))
        .route("/api/network/stats", get(get_network_stats))
        .route("/api/dataset", get(get_dataset))
        .route("/api/decision_boundary", get(get_decision_boundary))
        .route("/api/connections", get(get_connections))
        .route("/api/train/start", post(start_training))
        .route("/api/train/stop", post(stop_training))
        .route("/api/train/pause", post(pause_training))
        .route("/api/train/resume", post(resume_training))
        .route("/api/train/reset", post(reset_training))
        .route("/api/set_params", post(set_params))
        .with_state(state)
}
