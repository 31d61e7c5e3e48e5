//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid socket address: {0}")]
    InvalidSocketAddr(String),

    #[error("Service URL must start with http:// or https://")]
    InvalidServiceUrl,

    #[error("Auth is enabled but no API keys are configured")]
    NoApiKeysConfigured,

    #[error("Rate limit requests and window must be positive")]
    InvalidRateLimit,

    #[error("Invalid websocket setting: {0}")]
    InvalidWebSocket(&'static str),

    #[error("Invalid demo setting: {0}")]
    InvalidDemo(&'static str),
}
