//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `CANOPY` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use canopy::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod backend;
mod demo;
mod error;
mod security;
mod server;
mod websocket;

pub use backend::{is_truthy, BackendConfig, TRUTHY_VALUES};
pub use demo::DemoConfig;
pub use error::{ConfigError, ValidationError};
pub use security::SecurityConfig;
pub use server::{Environment, ServerConfig};
pub use websocket::WebSocketConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Every section has defaults, so an empty environment yields a demo-mode
/// server on port 8050 with auth disabled.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Backend selection (demo flag, service endpoint)
    #[serde(default)]
    pub backend: BackendConfig,

    /// Demo simulator tuning
    #[serde(default)]
    pub demo: DemoConfig,

    /// API key auth and rate limiting
    #[serde(default)]
    pub security: SecurityConfig,

    /// Connection manager and relay
    #[serde(default)]
    pub websocket: WebSocketConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `CANOPY` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `CANOPY__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `CANOPY__BACKEND__DEMO_MODE=1` -> `backend.demo_mode = "1"`
    /// - `CANOPY__BACKEND__SERVICE_URL=http://cascor:8200` -> remote backend
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CANOPY")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.backend.validate()?;
        self.demo.validate()?;
        self.security.validate()?;
        self.websocket.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
