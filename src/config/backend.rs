//! Training backend selection configuration

use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use super::error::ValidationError;

/// Values of the demo flag that count as "on".
///
/// Matching is case-sensitive: `TRUE` and `YES` are not accepted.
pub const TRUTHY_VALUES: &[&str] = &["1", "true", "True", "yes", "Yes"];

/// Returns true if a raw flag value is one of [`TRUTHY_VALUES`].
pub fn is_truthy(value: &str) -> bool {
    TRUTHY_VALUES.contains(&value)
}

/// Backend selection and remote-service client settings
#[derive(Clone, Deserialize)]
pub struct BackendConfig {
    /// Raw demo flag; see [`is_truthy`]
    pub demo_mode: Option<String>,

    /// Base URL of the remote training service
    pub service_url: Option<String>,

    /// API key forwarded to the remote training service
    pub service_api_key: Option<String>,

    /// Deadline for each remote call in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Deadline for establishing a connection in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl BackendConfig {
    /// True when the demo flag holds a truthy value.
    pub fn demo_mode_enabled(&self) -> bool {
        self.demo_mode.as_deref().is_some_and(is_truthy)
    }

    /// The service URL, if one is configured and non-blank.
    pub fn service_url(&self) -> Option<&str> {
        self.service_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Validate backend configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(url) = self.service_url() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ValidationError::InvalidServiceUrl);
            }
        }
        if self.request_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            demo_mode: None,
            service_url: None,
            service_api_key: None,
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("demo_mode", &self.demo_mode)
            .field("service_url", &self.service_url)
            .field(
                "service_api_key",
                &self.service_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

fn default_request_timeout() -> u64 {
    10
}

fn default_connect_timeout() -> u64 {
    5
}
