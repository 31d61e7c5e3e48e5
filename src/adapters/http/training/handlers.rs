//! HTTP handlers for training endpoints.
//!
//! Handlers delegate to the [`TrainingBackend`] port and translate its
//! declared outcomes into status codes. Control handlers nudge the metrics
//! relay after a successful change so clients see it without waiting a tick.

use std::sync::Arc;

use axum::extract::{Json, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::adapters::websocket::{ConnectionManager, ConnectionStats, RelayHandle};
use crate::domain::training::{
    BackendError, BackendResult, ControlAck, DatasetInfo, DecisionBoundary, MetricsEntry,
    NetworkStats, NetworkTopology, StatusSummary, TrainingParams, TrainingStateSnapshot,
};
use crate::ports::TrainingBackend;

use super::dto::{
    BoundaryQuery, ControlResponse, ErrorResponse, HistoryQuery, MetricsHistoryResponse,
    StartTrainingRequest,
};

// ════════════════════════════════════════════════════════════════════════════════
// Error Type
// ════════════════════════════════════════════════════════════════════════════════

/// Training API error that implements IntoResponse.
#[derive(Debug)]
pub enum TrainingApiError {
    /// The backend declared a failure.
    Backend(BackendError),
    /// The backend returned nothing for a read.
    Unavailable(&'static str),
}

impl TrainingApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            TrainingApiError::Backend(e) => match e {
                BackendError::NoNetwork
                | BackendError::AlreadyInProgress
                | BackendError::NotTraining => StatusCode::CONFLICT,
                BackendError::Unsupported { .. } => StatusCode::NOT_IMPLEMENTED,
                BackendError::InvalidParams(_) => StatusCode::BAD_REQUEST,
                BackendError::Unavailable(_)
                | BackendError::Timeout { .. }
                | BackendError::Remote { .. } => StatusCode::SERVICE_UNAVAILABLE,
            },
            TrainingApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for TrainingApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            TrainingApiError::Backend(e) => {
                if e.is_transient() {
                    tracing::warn!(code = e.code(), "Backend call failed: {}", e);
                } else {
                    tracing::debug!(code = e.code(), "Backend rejected request: {}", e);
                }
                ErrorResponse::new(e.code(), e.to_string())
            }
            TrainingApiError::Unavailable(what) => ErrorResponse::unavailable(what),
        };
        (status, Json(body)).into_response()
    }
}

impl From<BackendError> for TrainingApiError {
    fn from(error: BackendError) -> Self {
        TrainingApiError::Backend(error)
    }
}

type ApiResult<T> = Result<Json<T>, TrainingApiError>;

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for training routes.
#[derive(Clone)]
pub struct TrainingAppState {
    pub backend: Arc<dyn TrainingBackend>,
    pub manager: Arc<ConnectionManager>,
    pub relay: RelayHandle,
}

impl TrainingAppState {
    pub fn new(
        backend: Arc<dyn TrainingBackend>,
        manager: Arc<ConnectionManager>,
        relay: RelayHandle,
    ) -> Self {
        Self {
            backend,
            manager,
            relay,
        }
    }

    fn finish_control(
        &self,
        operation: &str,
        result: BackendResult<ControlAck>,
    ) -> ApiResult<ControlResponse> {
        let ack = result?;
        tracing::info!(
            operation,
            backend = %self.backend.backend_type(),
            is_training = ack.is_training,
            "Training control applied"
        );
        self.relay.nudge();
        Ok(Json(ack.into()))
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Read Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/state
pub async fn get_state(State(state): State<TrainingAppState>) -> ApiResult<TrainingStateSnapshot> {
    Ok(Json(state.backend.get_status().await?))
}

/// GET /api/status
pub async fn get_status_summary(State(state): State<TrainingAppState>) -> ApiResult<StatusSummary> {
    let snapshot = state.backend.get_status().await?;
    let has_network = state.backend.has_network().await;
    let latest = state.backend.get_metrics().await.ok().flatten();
    Ok(Json(StatusSummary::from_snapshot(
        state.backend.backend_type(),
        &snapshot,
        has_network,
        latest,
    )))
}

/// GET /api/metrics
pub async fn get_metrics(State(state): State<TrainingAppState>) -> ApiResult<MetricsEntry> {
    state
        .backend
        .get_metrics()
        .await?
        .map(Json)
        .ok_or(TrainingApiError::Unavailable("metrics"))
}

/// GET /api/metrics/history?count=N
pub async fn get_metrics_history(
    State(state): State<TrainingAppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<MetricsHistoryResponse> {
    let history = state
        .backend
        .get_metrics_history(query.effective_count())
        .await?;
    Ok(Json(MetricsHistoryResponse {
        count: history.len(),
        history,
    }))
}

/// GET /api/network/topology
pub async fn get_topology(State(state): State<TrainingAppState>) -> ApiResult<NetworkTopology> {
    state
        .backend
        .get_network_topology()
        .await
        .map(Json)
        .ok_or(TrainingApiError::Unavailable("network topology"))
}

/// GET /api/network/stats
pub async fn get_network_stats(State(state): State<TrainingAppState>) -> Json<NetworkStats> {
    Json(state.backend.get_network_stats().await)
}

/// GET /api/dataset
pub async fn get_dataset(State(state): State<TrainingAppState>) -> ApiResult<DatasetInfo> {
    state
        .backend
        .get_dataset()
        .await
        .map(Json)
        .ok_or(TrainingApiError::Unavailable("dataset"))
}

/// GET /api/decision_boundary?resolution=N
pub async fn get_decision_boundary(
    State(state): State<TrainingAppState>,
    Query(query): Query<BoundaryQuery>,
) -> ApiResult<DecisionBoundary> {
    state
        .backend
        .get_decision_boundary(query.effective_resolution())
        .await
        .map(Json)
        .ok_or(TrainingApiError::Unavailable("decision boundary"))
}

/// GET /api/connections
pub async fn get_connections(State(state): State<TrainingAppState>) -> Json<ConnectionStats> {
    Json(state.manager.stats().await)
}

// ════════════════════════════════════════════════════════════════════════════════
// Control Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/train/start
///
/// The body is optional; a missing or unreadable body starts with defaults.
pub async fn start_training(
    State(state): State<TrainingAppState>,
    body: Option<Json<StartTrainingRequest>>,
) -> ApiResult<ControlResponse> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let result = state
        .backend
        .start_training(request.reset, request.params)
        .await;
    state.finish_control("start", result)
}

/// POST /api/train/stop
pub async fn stop_training(State(state): State<TrainingAppState>) -> ApiResult<ControlResponse> {
    let result = state.backend.stop_training().await;
    state.finish_control("stop", result)
}

/// POST /api/train/pause
pub async fn pause_training(State(state): State<TrainingAppState>) -> ApiResult<ControlResponse> {
    let result = state.backend.pause_training().await;
    state.finish_control("pause", result)
}

/// POST /api/train/resume
pub async fn resume_training(State(state): State<TrainingAppState>) -> ApiResult<ControlResponse> {
    let result = state.backend.resume_training().await;
    state.finish_control("resume", result)
}

/// POST /api/train/reset
pub async fn reset_training(State(state): State<TrainingAppState>) -> ApiResult<ControlResponse> {
    let result = state.backend.reset_training().await;
    state.finish_control("reset", result)
}

/// POST /api/set_params
pub async fn set_params(
    State(state): State<TrainingAppState>,
    Json(params): Json<TrainingParams>,
) -> ApiResult<ControlResponse> {
    let result = state.backend.apply_params(params).await;
    state.finish_control("set_params", result)
}
