//! Top-level HTTP router: every route plus the shared middleware stack.

use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::{middleware, Router};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::health::{health_routes, HealthState};
use super::middleware::{security_middleware, SecurityState};
use super::training::{training_routes, TrainingAppState};
use crate::adapters::websocket::{websocket_router, ConnectionManager, RelayHandle, WebSocketState};
use crate::config::ServerConfig;
use crate::ports::TrainingBackend;

/// Everything the HTTP surface needs.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn TrainingBackend>,
    pub manager: Arc<ConnectionManager>,
    pub relay: RelayHandle,
    pub security: SecurityState,
}

/// Builds the application router.
///
/// Layer order (outermost first): trace, CORS, timeout, security. The
/// WebSocket route is merged after the security layer and is not gated by it.
pub fn build_router(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .merge(health_routes(HealthState {
            backend: state.backend.clone(),
        }))
        .merge(training_routes(TrainingAppState::new(
            state.backend.clone(),
            state.manager.clone(),
            state.relay.clone(),
        )))
        .layer(middleware::from_fn_with_state(
            state.security.clone(),
            security_middleware,
        ))
        .merge(websocket_router(WebSocketState::new(state.manager.clone())))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(server))
                .layer(TimeoutLayer::new(server.request_timeout())),
        )
}

/// Allows any origin unless `cors_origins` lists some.
fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}
