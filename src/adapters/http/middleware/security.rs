//! API-key authentication and rate limiting middleware for axum.
//!
//! # Request flow
//!
//! ```text
//! Request ─▶ exempt? ──yes──────────────────────────────▶ handler
//!              │no
//!              ▼
//!          auth check ──fail──▶ 401 {"detail"}
//!              │ok
//!              ▼
//!          rate check ──fail──▶ 429 {"detail", "retry_after", "reset"}
//!              │ok
//!              ▼
//!           handler ─▶ response + X-RateLimit-* headers
//! ```
//!
//! Exempt requests are the health, docs and root paths and anything under
//! `/dashboard`. The WebSocket endpoint is mounted outside this layer, so
//! request headers never grant an exemption.
//!
//! The API key is read from `X-API-Key` or `Authorization: Bearer <key>`
//! and compared in constant time.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get, middleware};
//!
//! let security = SecurityState::from_config(&config.security);
//!
//! let app = Router::new()
//!     .route("/api/state", get(handler))
//!     .layer(middleware::from_fn_with_state(security, security_middleware));
//! ```

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};
use subtle::{Choice, ConstantTimeEq};

use crate::adapters::rate_limiter::InMemoryRateLimiter;
use crate::config::SecurityConfig;
use crate::ports::{RateLimitDenied, RateLimitKey, RateLimitResult, RateLimitStatus, RateLimiter};

/// Standard rate limit header names.
pub mod headers {
    use super::HeaderName;

    /// Maximum requests allowed in the window.
    pub static X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
    /// Requests remaining in the current window.
    pub static X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
    /// Unix timestamp when the window resets.
    pub static X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");
    /// API key request header.
    pub static X_API_KEY: HeaderName = HeaderName::from_static("x-api-key");
}

/// Paths served without authentication or rate limiting.
pub static EXEMPT_PATHS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "/",
        "/health",
        "/api/health",
        "/v1/health",
        "/v1/health/live",
        "/v1/health/ready",
        "/docs",
        "/openapi.json",
        "/redoc",
    ]
    .into_iter()
    .collect()
});

/// Path prefix for dashboard assets, also exempt.
pub const EXEMPT_PREFIX: &str = "/dashboard";

const FINGERPRINT_BYTES: usize = 8;

/// Middleware state: auth settings plus the limiter.
#[derive(Clone)]
pub struct SecurityState {
    auth_enabled: bool,
    api_keys: Arc<Vec<String>>,
    rate_limit_enabled: bool,
    limiter: Arc<dyn RateLimiter>,
}

impl SecurityState {
    pub fn new(config: &SecurityConfig, limiter: Arc<dyn RateLimiter>) -> Self {
        Self {
            auth_enabled: config.auth_enabled,
            api_keys: Arc::new(config.api_keys_list()),
            rate_limit_enabled: config.rate_limit_enabled,
            limiter,
        }
    }

    /// Uses an [`InMemoryRateLimiter`] sized from the config.
    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(config, Arc::new(InMemoryRateLimiter::from_config(config)))
    }

    /// Compares against every configured key without short-circuiting.
    pub fn is_valid_key(&self, candidate: &str) -> bool {
        let matched = self
            .api_keys
            .iter()
            .fold(Choice::from(0), |acc, key| {
                acc | key.as_bytes().ct_eq(candidate.as_bytes())
            });
        matched.into()
    }

    /// Whether requests are counted at all.
    pub fn rate_limit_enabled(&self) -> bool {
        self.rate_limit_enabled
    }

    pub fn limiter(&self) -> &Arc<dyn RateLimiter> {
        &self.limiter
    }
}

/// Authentication and rate limiting in one layer.
pub async fn security_middleware(
    State(state): State<SecurityState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    if is_exempt(&request) {
        return next.run(request).await;
    }

    let api_key = extract_api_key(request.headers());

    if state.auth_enabled {
        match api_key.as_deref() {
            None => {
                tracing::debug!(path = %request.uri().path(), "Rejected request without API key");
                return unauthorized_response("Missing API key");
            }
            Some(key) if !state.is_valid_key(key) => {
                tracing::warn!(path = %request.uri().path(), "Rejected request with invalid API key");
                return unauthorized_response("Invalid API key");
            }
            Some(_) => {}
        }
    }

    let mut status: Option<RateLimitStatus> = None;
    if state.rate_limit_enabled {
        // Unknown keys are limited by address, not given a bucket each.
        let trusted_key = api_key.as_deref().filter(|key| state.is_valid_key(key));
        let key = bucket_key(trusted_key, &request, connect_info.as_ref());
        match state.limiter.check(key).await {
            Ok(RateLimitResult::Allowed(allowed)) => status = Some(allowed),
            Ok(RateLimitResult::Denied(denied)) => {
                tracing::info!(scope = %denied.scope, path = %request.uri().path(), "Rate limit exceeded");
                return rate_limit_response(&denied);
            }
            Err(e) => {
                // Fail open for availability.
                tracing::warn!("Rate limiter unavailable: {}", e);
            }
        }
    }

    let mut response = next.run(request).await;

    if let Some(status) = status {
        add_rate_limit_headers(
            &mut response,
            status.limit,
            status.remaining,
            status.reset_at.as_unix_secs(),
        );
    }

    response
}

/// Whether a request bypasses auth and rate limiting. Decided by path only.
pub fn is_exempt<B>(request: &axum::http::Request<B>) -> bool {
    let path = request.uri().path();
    EXEMPT_PATHS.contains(path) || path.starts_with(EXEMPT_PREFIX)
}

/// Reads the API key from `X-API-Key`, then `Authorization: Bearer`.
pub fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    let from_header = headers
        .get(&headers::X_API_KEY)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty());

    let key = from_header.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|k| !k.is_empty())
    });

    key.map(str::to_string)
}

/// Short SHA-256 fingerprint so raw keys never become map keys.
pub fn key_fingerprint(key: &str) -> String {
    Sha256::digest(key.as_bytes())
        .iter()
        .take(FINGERPRINT_BYTES)
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Picks the rate-limit bucket: API key, then client IP, then anonymous.
///
/// `api_key` must already be checked against the configured keys.
fn bucket_key<B>(
    api_key: Option<&str>,
    request: &axum::http::Request<B>,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
) -> RateLimitKey {
    if let Some(key) = api_key {
        return RateLimitKey::api_key(&key_fingerprint(key));
    }
    match extract_client_ip(request, connect_info) {
        Some(ip) => RateLimitKey::ip(&ip),
        None => RateLimitKey::anonymous(),
    }
}

/// Extract client IP from request, checking forwarded headers first.
///
/// Order of precedence:
/// 1. X-Forwarded-For header (first IP in list)
/// 2. X-Real-IP header
/// 3. ConnectInfo socket address
fn extract_client_ip<B>(
    request: &axum::http::Request<B>,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
) -> Option<String> {
    if let Some(forwarded) = request
        .headers()
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
    {
        if let Some(first_ip) = forwarded.split(',').next().map(str::trim) {
            if !first_ip.is_empty() {
                return Some(first_ip.to_string());
            }
        }
    }

    if let Some(real_ip) = request
        .headers()
        .get("X-Real-IP")
        .and_then(|h| h.to_str().ok())
    {
        return Some(real_ip.trim().to_string());
    }

    connect_info.map(|ci| ci.0.ip().to_string())
}

fn unauthorized_response(detail: &str) -> Response {
    let mut response = (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "detail": detail })),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("ApiKey"));
    response
}

/// Create a 429 Too Many Requests response.
fn rate_limit_response(denied: &RateLimitDenied) -> Response {
    let reset = denied.reset_at.as_unix_secs();
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(serde_json::json!({
            "detail": denied.message,
            "retry_after": denied.retry_after_secs,
            "reset": reset,
        })),
    )
        .into_response();

    add_rate_limit_headers(&mut response, denied.limit, 0, reset);
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(denied.retry_after_secs));
    response
}

/// Add rate limit headers to a response.
fn add_rate_limit_headers(response: &mut Response, limit: u32, remaining: u32, reset_at: u64) {
    let headers = response.headers_mut();
    headers.insert(headers::X_RATELIMIT_LIMIT.clone(), HeaderValue::from(limit));
    headers.insert(headers::X_RATELIMIT_REMAINING.clone(), HeaderValue::from(remaining));
    headers.insert(headers::X_RATELIMIT_RESET.clone(), HeaderValue::from(reset_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::{middleware, routing::get, Router};
    use tower::ServiceExt;

    fn config(auth: bool, limit: u32) -> SecurityConfig {
        SecurityConfig {
            auth_enabled: auth,
            api_keys: Some("alpha, beta".to_string()),
            rate_limit_enabled: true,
            rate_limit_requests: limit,
            rate_limit_window_secs: 60,
        }
    }

    fn app(config: &SecurityConfig) -> Router {
        Router::new()
            .route("/api/state", get(|| async { "state" }))
            .route("/health", get(|| async { "ok" }))
            .route("/dashboard/app.js", get(|| async { "js" }))
            .layer(middleware::from_fn_with_state(
                SecurityState::from_config(config),
                security_middleware,
            ))
    }

    fn get_with(uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Extraction Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn extract_ip_from_x_forwarded_for() {
        let request = get_with("/test", &[("X-Forwarded-For", "1.2.3.4, 5.6.7.8")]);
        assert_eq!(extract_client_ip(&request, None), Some("1.2.3.4".to_string()));
    }

    #[test]
    fn extract_ip_prefers_x_forwarded_for() {
        let request = get_with(
            "/test",
            &[("X-Forwarded-For", "1.2.3.4"), ("X-Real-IP", "5.6.7.8")],
        );
        assert_eq!(extract_client_ip(&request, None), Some("1.2.3.4".to_string()));
    }

    #[test]
    fn extract_ip_falls_back_to_socket() {
        let request = get_with("/test", &[]);
        let addr: SocketAddr = "10.1.2.3:5555".parse().unwrap();
        assert_eq!(
            extract_client_ip(&request, Some(&ConnectInfo(addr))),
            Some("10.1.2.3".to_string())
        );
        assert_eq!(extract_client_ip(&request, None), None);
    }

    #[test]
    fn api_key_from_either_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("alpha"));
        assert_eq!(extract_api_key(&headers), Some("alpha".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer beta"));
        assert_eq!(extract_api_key(&headers), Some("beta".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_api_key(&headers), None);
    }

    #[test]
    fn fingerprint_is_stable_and_short() {
        assert_eq!(key_fingerprint("alpha"), key_fingerprint("alpha"));
        assert_ne!(key_fingerprint("alpha"), key_fingerprint("beta"));
        assert_eq!(key_fingerprint("alpha").len(), FINGERPRINT_BYTES * 2);
    }

    #[test]
    fn key_validation() {
        let state = SecurityState::from_config(&config(true, 10));
        assert!(state.is_valid_key("alpha"));
        assert!(state.is_valid_key("beta"));
        assert!(!state.is_valid_key("alph"));
        assert!(!state.is_valid_key(""));
    }

    #[test]
    fn exemptions() {
        for path in ["/", "/health", "/v1/health/ready", "/docs", "/dashboard/x.css"] {
            assert!(is_exempt(&get_with(path, &[])), "{} should be exempt", path);
        }
        assert!(!is_exempt(&get_with("/api/state", &[])));
        assert!(!is_exempt(&get_with("/healthz", &[])));
        assert!(!is_exempt(&get_with("/api/state", &[("Upgrade", "websocket")])));
        assert!(!is_exempt(&get_with(
            "/api/state",
            &[("Connection", "Upgrade"), ("Upgrade", "WebSocket")]
        )));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Middleware Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn missing_key_is_unauthorized() {
        let response = app(&config(true, 10))
            .oneshot(get_with("/api/state", &[]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_key_is_unauthorized() {
        let response = app(&config(true, 10))
            .oneshot(get_with("/api/state", &[("X-API-Key", "gamma")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_key_passes_with_headers() {
        let response = app(&config(true, 10))
            .oneshot(get_with("/api/state", &[("X-API-Key", "alpha")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-limit"], "10");
        assert_eq!(response.headers()["x-ratelimit-remaining"], "9");
        assert!(response.headers().contains_key("x-ratelimit-reset"));
    }

    #[tokio::test]
    async fn exempt_path_needs_no_key() {
        let response = app(&config(true, 10))
            .oneshot(get_with("/health", &[]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key("x-ratelimit-limit"));
    }

    #[tokio::test]
    async fn auth_disabled_passes_without_key() {
        let response = app(&config(false, 10))
            .oneshot(get_with("/api/state", &[]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn no_rate_headers_when_rate_limit_disabled() {
        let config = SecurityConfig {
            rate_limit_enabled: false,
            ..config(false, 10)
        };
        let response = app(&config)
            .oneshot(get_with("/api/state", &[]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key("x-ratelimit-limit"));
    }

    #[tokio::test]
    async fn exceeding_limit_returns_429() {
        let app = app(&config(true, 2));
        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(get_with("/api/state", &[("X-API-Key", "alpha")]))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .clone()
            .oneshot(get_with("/api/state", &[("X-API-Key", "alpha")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("retry-after"));
        assert_eq!(response.headers()["x-ratelimit-remaining"], "0");

        // A different key has its own bucket.
        let response = app
            .oneshot(get_with("/api/state", &[("X-API-Key", "beta")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_keys_share_the_client_bucket() {
        let app = app(&config(false, 1));
        let from_client = |key: &'static str| {
            get_with(
                "/api/state",
                &[("X-API-Key", key), ("X-Forwarded-For", "203.0.113.9")],
            )
        };

        let response = app.clone().oneshot(from_client("junk-0")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Rotating to another unknown key does not reset the budget.
        let response = app.clone().oneshot(from_client("junk-1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        // A configured key still gets its own bucket.
        let response = app.oneshot(from_client("alpha")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
