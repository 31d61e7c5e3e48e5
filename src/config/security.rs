//! API key authentication and rate limiting configuration

use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use super::error::ValidationError;

/// Security middleware configuration
#[derive(Clone, Deserialize)]
pub struct SecurityConfig {
    /// Require a valid API key on non-exempt routes
    #[serde(default)]
    pub auth_enabled: bool,

    /// Accepted API keys (comma-separated)
    pub api_keys: Option<String>,

    /// Enforce per-caller request budgets
    #[serde(default = "default_rate_limit_enabled")]
    pub rate_limit_enabled: bool,

    /// Requests allowed per window
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests: u32,

    /// Window length in seconds
    #[serde(default = "default_rate_limit_window")]
    pub rate_limit_window_secs: u64,
}

impl SecurityConfig {
    /// Get API keys as a vector, skipping blanks
    pub fn api_keys_list(&self) -> Vec<String> {
        self.api_keys
            .as_ref()
            .map(|s| {
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Window length, at least one second
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs.max(1))
    }

    /// Validate security configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.auth_enabled && self.api_keys_list().is_empty() {
            return Err(ValidationError::NoApiKeysConfigured);
        }
        if self.rate_limit_enabled
            && (self.rate_limit_requests == 0 || self.rate_limit_window_secs == 0)
        {
            return Err(ValidationError::InvalidRateLimit);
        }
        Ok(())
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            auth_enabled: false,
            api_keys: None,
            rate_limit_enabled: default_rate_limit_enabled(),
            rate_limit_requests: default_rate_limit_requests(),
            rate_limit_window_secs: default_rate_limit_window(),
        }
    }
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("auth_enabled", &self.auth_enabled)
            .field("api_keys", &format!("[{} keys]", self.api_keys_list().len()))
            .field("rate_limit_enabled", &self.rate_limit_enabled)
            .field("rate_limit_requests", &self.rate_limit_requests)
            .field("rate_limit_window_secs", &self.rate_limit_window_secs)
            .finish()
    }
}

fn default_rate_limit_enabled() -> bool {
    true
}

fn default_rate_limit_requests() -> u32 {
    100
}

fn default_rate_limit_window() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_disable_auth_and_enable_rate_limit() {
        let config = SecurityConfig::default();
        assert!(!config.auth_enabled);
        assert!(config.rate_limit_enabled);
        assert_eq!(config.rate_limit_requests, 100);
        assert_eq!(config.rate_limit_window_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rate_limit_window_is_never_zero() {
        let config = SecurityConfig {
            rate_limit_window_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.rate_limit_window(), Duration::from_secs(1));
        assert_eq!(
            SecurityConfig::default().rate_limit_window(),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn api_keys_are_split_and_trimmed() {
        let config = SecurityConfig {
            api_keys: Some(" key-a ,key-b,, ".to_string()),
            ..Default::default()
        };
        assert_eq!(config.api_keys_list(), vec!["key-a", "key-b"]);
    }

    #[test]
    fn auth_without_keys_is_invalid() {
        let config = SecurityConfig {
            auth_enabled: true,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::NoApiKeysConfigured));
    }

    #[test]
    fn zero_rate_limit_is_invalid_only_when_enabled() {
        let mut config = SecurityConfig {
            rate_limit_requests: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidRateLimit));

        config.rate_limit_enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn debug_hides_key_values() {
        let config = SecurityConfig {
            api_keys: Some("secret-one,secret-two".to_string()),
            ..Default::default()
        };
        let printed = format!("{:?}", config);
        assert!(!printed.contains("secret-one"));
        assert!(printed.contains("[2 keys]"));
    }
}
