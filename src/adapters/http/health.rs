//! Liveness and readiness endpoints. All of them are exempt from auth.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::domain::training::BackendKind;
use crate::ports::TrainingBackend;

#[derive(Clone)]
pub struct HealthState {
    pub backend: Arc<dyn TrainingBackend>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub backend_type: BackendKind,
    pub has_network: bool,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub websocket: &'static str,
}

async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        websocket: crate::adapters::websocket::WEBSOCKET_PATH,
    })
}

async fn live() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Ready once the backend answers a status read.
async fn ready(State(state): State<HealthState>) -> Response {
    let backend_type = state.backend.backend_type();
    match state.backend.get_status().await {
        Ok(_) => Json(ReadinessResponse {
            status: "ready",
            backend_type,
            has_network: state.backend.has_network().await,
        })
        .into_response(),
        Err(e) => {
            tracing::warn!(backend = %backend_type, "Readiness check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "unavailable",
                    "backend_type": backend_type,
                    "detail": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

/// Creates the health router.
pub fn health_routes(state: HealthState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(live))
        .route("/api/health", get(live))
        .route("/v1/health", get(live))
        .route("/v1/health/live", get(live))
        .route("/v1/health/ready", get(ready))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::adapters::backend::DemoBackend;
    use crate::config::DemoConfig;

    fn app() -> Router {
        health_routes(HealthState {
            backend: Arc::new(DemoBackend::new(DemoConfig::default())),
        })
    }

    #[tokio::test]
    async fn liveness_paths_answer() {
        for path in ["/", "/health", "/api/health", "/v1/health", "/v1/health/live"] {
            let response = app()
                .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{}", path);
        }
    }

    #[tokio::test]
    async fn demo_backend_is_ready() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/v1/health/ready")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["backend_type"], "demo");
    }
}
