//! Remote training-service backend.
//!
//! Talks to a training service over HTTP. Only start/stop are exposed by the
//! remote protocol; pause, resume, reset and parameter updates are declared
//! unsupported, and the decision boundary is never available because it
//! needs in-process model access.
//!
//! # Configuration
//!
//! ```ignore
//! let config = ServiceConfig::new("http://trainer:8000")
//!     .with_api_key("secret")
//!     .with_request_timeout(Duration::from_secs(10));
//!
//! let backend = ServiceBackend::new(config)?;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::BackendConfig;
use crate::domain::foundation::Timestamp;
use crate::domain::training::{
    BackendError, BackendKind, BackendResult, ControlAck, DatasetInfo, DecisionBoundary,
    MetricsEntry, NetworkStats, NetworkTopology, TrainingParams, TrainingPhase, TrainingStatus,
    TrainingStateSnapshot,
};
use crate::ports::{unsupported, TrainingBackend};

/// Header carrying the API key on outbound calls.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Configuration for the service backend.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL of the training service, without trailing slash.
    pub base_url: String,
    api_key: Option<Secret<String>>,
    /// Bound on every outbound call.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl ServiceConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
        }
    }

    /// Builds a service config from backend settings, if a URL is configured.
    pub fn from_backend_config(config: &BackendConfig) -> Option<Self> {
        let url = config.service_url()?;
        let mut service = Self::new(url)
            .with_request_timeout(config.request_timeout())
            .with_connect_timeout(config.connect_timeout());
        if let Some(key) = config.service_api_key.as_deref().filter(|k| !k.is_empty()) {
            service = service.with_api_key(key);
        }
        Some(service)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(Secret::new(api_key.into()));
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|k| k.expose_secret().as_str())
    }
}

/// Status payload returned by `GET /v1/training/status`.
///
/// Every field is optional on the wire; status strings outside the known
/// set read as stopped and unknown phases as idle.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RemoteStatus {
    status: String,
    phase: String,
    learning_rate: f64,
    max_hidden_units: u32,
    max_epochs: u64,
    current_epoch: u64,
    current_step: u64,
    network_name: String,
    dataset_name: String,
    threshold_function: String,
    optimizer_name: String,
}

impl RemoteStatus {
    fn into_snapshot(self) -> TrainingStateSnapshot {
        let status = match self.status.as_str() {
            "started" | "running" | "training" => TrainingStatus::Started,
            "paused" => TrainingStatus::Paused,
            _ => TrainingStatus::Stopped,
        };

        TrainingStateSnapshot {
            status,
            phase: TrainingPhase::from_wire(&self.phase),
            learning_rate: self.learning_rate,
            max_hidden_units: self.max_hidden_units,
            max_epochs: self.max_epochs,
            current_epoch: self.current_epoch,
            current_step: self.current_step,
            network_name: self.network_name,
            dataset_name: self.dataset_name,
            threshold_function: self.threshold_function,
            optimizer_name: self.optimizer_name,
            timestamp: Timestamp::now().as_unix_secs_f64(),
        }
    }
}

#[derive(Debug, Serialize)]
struct StartRequest<'a> {
    reset: bool,
    #[serde(flatten)]
    params: &'a TrainingParams,
}

#[derive(Debug, Deserialize)]
struct RemoteError {
    #[serde(alias = "error", alias = "message")]
    detail: String,
}

/// Backend proxying to a remote training service.
pub struct ServiceBackend {
    config: ServiceConfig,
    client: Client,
    ready: AtomicBool,
}

impl ServiceBackend {
    /// Creates the backend. No network traffic happens until `initialize`.
    pub fn new(config: ServiceConfig) -> BackendResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| BackendError::unavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            ready: AtomicBool::new(false),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Whether the last `initialize` reached the service.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Sends a request under the configured deadline.
    async fn send(&self, request: RequestBuilder) -> BackendResult<Response> {
        let request = match self.config.api_key() {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        };
        let timeout = self.config.request_timeout;

        match tokio::time::timeout(timeout, request.send()).await {
            Err(_) => Err(BackendError::Timeout {
                timeout_secs: timeout.as_secs(),
            }),
            Ok(Err(e)) => Err(self.transport_error(e)),
            Ok(Ok(response)) => Ok(response),
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            BackendError::Timeout {
                timeout_secs: self.config.request_timeout.as_secs(),
            }
        } else if e.is_connect() {
            BackendError::unavailable(format!("connection failed: {}", e))
        } else {
            BackendError::unavailable(e.to_string())
        }
    }

    /// Turns a non-success response into [`BackendError::Remote`].
    async fn remote_error(response: Response) -> BackendError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<RemoteError>(&body)
            .map(|e| e.detail)
            .unwrap_or(body);
        BackendError::Remote { status, message }
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> BackendResult<T> {
        let status = response.status().as_u16();
        response.json().await.map_err(|e| BackendError::Remote {
            status,
            message: format!("malformed response body: {}", e),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> BackendResult<T> {
        let response = self.send(self.client.get(self.url(path))).await?;
        if !response.status().is_success() {
            return Err(Self::remote_error(response).await);
        }
        Self::parse(response).await
    }

    /// GET where 404 and 204 mean "nothing there".
    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> BackendResult<Option<T>> {
        let response = self.send(self.client.get(self.url(path))).await?;
        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::NO_CONTENT => Ok(None),
            s if s.is_success() => Self::parse(response).await.map(Some),
            _ => Err(Self::remote_error(response).await),
        }
    }

    /// Logs a failed introspection read and returns `None`.
    fn degrade<T>(&self, what: &str, result: BackendResult<Option<T>>) -> Option<T> {
        result.unwrap_or_else(|e| {
            tracing::warn!(error = %e, url = %self.config.base_url, "Service {} unavailable", what);
            None
        })
    }
}

#[async_trait]
impl TrainingBackend for ServiceBackend {
    fn backend_type(&self) -> BackendKind {
        BackendKind::Service
    }

    async fn initialize(&self) -> bool {
        let result = self
            .send(self.client.get(self.url("/v1/health/ready")))
            .await;

        let ready = match result {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!(
                    status = response.status().as_u16(),
                    url = %self.config.base_url,
                    "Training service not ready"
                );
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, url = %self.config.base_url, "Training service unreachable");
                false
            }
        };

        self.ready.store(ready, Ordering::Release);
        if ready {
            tracing::info!(url = %self.config.base_url, "Service backend initialized");
        }
        ready
    }

    async fn shutdown(&self) {
        self.ready.store(false, Ordering::Release);
        tracing::info!(url = %self.config.base_url, "Service backend shut down");
    }

    async fn start_training(
        &self,
        reset: bool,
        params: TrainingParams,
    ) -> BackendResult<ControlAck> {
        params.validate()?;
        let body = StartRequest {
            reset,
            params: &params,
        };
        let response = self
            .send(self.client.post(self.url("/v1/training/start")).json(&body))
            .await?;

        match response.status() {
            StatusCode::CONFLICT => Err(BackendError::AlreadyInProgress),
            StatusCode::PRECONDITION_FAILED => Err(BackendError::NoNetwork),
            s if s.is_success() => Ok(ControlAck::training(true).with_message("training started")),
            _ => Err(Self::remote_error(response).await),
        }
    }

    async fn stop_training(&self) -> BackendResult<ControlAck> {
        let response = self
            .send(self.client.post(self.url("/v1/training/stop")))
            .await?;
        if !response.status().is_success() {
            return Err(Self::remote_error(response).await);
        }
        Ok(ControlAck::training(false).with_message("training stopped"))
    }

    async fn pause_training(&self) -> BackendResult<ControlAck> {
        unsupported("pause_training", BackendKind::Service)
    }

    async fn resume_training(&self) -> BackendResult<ControlAck> {
        unsupported("resume_training", BackendKind::Service)
    }

    async fn reset_training(&self) -> BackendResult<ControlAck> {
        unsupported("reset_training", BackendKind::Service)
    }

    async fn apply_params(&self, _params: TrainingParams) -> BackendResult<ControlAck> {
        unsupported("apply_params", BackendKind::Service)
    }

    async fn get_status(&self) -> BackendResult<TrainingStateSnapshot> {
        let status: RemoteStatus = self.get_json("/v1/training/status").await?;
        Ok(status.into_snapshot())
    }

    async fn get_metrics(&self) -> BackendResult<Option<MetricsEntry>> {
        self.get_optional("/v1/metrics").await
    }

    async fn get_metrics_history(&self, count: usize) -> BackendResult<Vec<MetricsEntry>> {
        let path = format!("/v1/metrics/history?count={}", count);
        let mut history: Vec<MetricsEntry> = self
            .get_optional(&path)
            .await?
            .unwrap_or_default();
        let excess = history.len().saturating_sub(count);
        history.drain(..excess);
        Ok(history)
    }

    async fn has_network(&self) -> bool {
        match self.send(self.client.get(self.url("/v1/network"))).await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!(error = %e, url = %self.config.base_url, "Service network check failed");
                false
            }
        }
    }

    async fn get_network_topology(&self) -> Option<NetworkTopology> {
        let result = self.get_optional("/v1/network/topology").await;
        self.degrade("topology", result)
    }

    async fn get_network_stats(&self) -> NetworkStats {
        let result = self.get_optional("/v1/network/stats").await;
        self.degrade("network stats", result).unwrap_or_default()
    }

    async fn get_dataset(&self) -> Option<DatasetInfo> {
        let result = self.get_optional("/v1/dataset").await;
        self.degrade("dataset", result)
    }

    async fn get_decision_boundary(&self, _resolution: usize) -> Option<DecisionBoundary> {
        None
    }
}
