//! In-memory rate limiter.
//!
//! Uses a fixed-window counter algorithm with an in-memory HashMap. Every
//! bucket shares the same limit and window; buckets are told apart by
//! [`RateLimitKey`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::SecurityConfig;
use crate::domain::foundation::Timestamp;
use crate::ports::{
    RateLimitDenied, RateLimitError, RateLimitKey, RateLimitResult, RateLimitStatus, RateLimiter,
};

/// Fixed-window rate limiter for single-server deployments.
#[derive(Debug, Clone)]
pub struct InMemoryRateLimiter {
    /// Requests allowed per window.
    limit: u32,
    window_secs: u64,
    /// Per-key window state.
    windows: Arc<RwLock<HashMap<String, WindowState>>>,
}

/// State for a single rate limit window.
#[derive(Debug, Clone)]
struct WindowState {
    /// Number of requests in the current window.
    count: u32,
    /// When the current window started, unix seconds.
    window_start: u64,
}

impl WindowState {
    fn window_end(&self, window_secs: u64) -> u64 {
        self.window_start + window_secs
    }
}

impl InMemoryRateLimiter {
    pub fn new(limit: u32, window_secs: u64) -> Self {
        Self {
            limit,
            window_secs,
            windows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Builds a limiter from the security settings.
    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(config.rate_limit_requests, config.rate_limit_window_secs)
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of tracked buckets.
    pub async fn tracked_keys(&self) -> usize {
        self.windows.read().await.len()
    }

    fn now_secs() -> u64 {
        Timestamp::now().as_unix_secs()
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(&self, key: RateLimitKey) -> Result<RateLimitResult, RateLimitError> {
        let storage_key = key.storage_key();
        let now = Self::now_secs();

        let mut windows = self.windows.write().await;

        let state = windows.entry(storage_key).or_insert_with(|| WindowState {
            count: 0,
            window_start: now,
        });

        if now >= state.window_end(self.window_secs) {
            state.count = 0;
            state.window_start = now;
        }

        let window_end = state.window_end(self.window_secs);
        let reset_at = Timestamp::from_unix_secs(window_end);

        if state.count >= self.limit {
            let retry_after = window_end.saturating_sub(now).max(1);
            return Ok(RateLimitResult::Denied(RateLimitDenied {
                limit: self.limit,
                retry_after_secs: retry_after,
                reset_at,
                scope: key.scope,
                message: format!(
                    "Rate limit exceeded for {}. Retry after {} seconds.",
                    key.scope, retry_after
                ),
            }));
        }

        state.count += 1;

        Ok(RateLimitResult::Allowed(RateLimitStatus {
            limit: self.limit,
            remaining: self.limit.saturating_sub(state.count),
            reset_at,
            window_secs: self.window_secs,
        }))
    }

    async fn purge_expired(&self) -> Result<usize, RateLimitError> {
        let now = Self::now_secs();
        let mut windows = self.windows.write().await;
        let before = windows.len();
        windows.retain(|_, state| now < state.window_end(self.window_secs));
        Ok(before - windows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::RateLimitScope;
    use std::time::Duration;

    #[tokio::test]
    async fn allows_requests_within_limit() {
        let limiter = InMemoryRateLimiter::new(10, 60);
        let key = RateLimitKey::ip("192.168.1.1");

        for i in 0..10 {
            let result = limiter.check(key.clone()).await.unwrap();
            assert!(result.is_allowed(), "Request {} should be allowed", i + 1);
        }
    }

    #[tokio::test]
    async fn denies_requests_past_limit() {
        let limiter = InMemoryRateLimiter::new(5, 60);
        let key = RateLimitKey::api_key("abc123");

        for _ in 0..5 {
            assert!(limiter.check(key.clone()).await.unwrap().is_allowed());
        }

        let result = limiter.check(key.clone()).await.unwrap();
        match result {
            RateLimitResult::Denied(denied) => {
                assert_eq!(denied.limit, 5);
                assert!(denied.retry_after_secs > 0);
                assert!(denied.retry_after_secs <= 60);
                assert_eq!(denied.scope, RateLimitScope::ApiKey);
            }
            RateLimitResult::Allowed(_) => panic!("sixth request should be denied"),
        }
    }

    #[tokio::test]
    async fn remaining_decrements_correctly() {
        let limiter = InMemoryRateLimiter::new(10, 60);
        let key = RateLimitKey::anonymous();

        for expected_remaining in (0..10u32).rev() {
            match limiter.check(key.clone()).await.unwrap() {
                RateLimitResult::Allowed(status) => {
                    assert_eq!(status.remaining, expected_remaining)
                }
                RateLimitResult::Denied(_) => panic!("should be allowed"),
            }
        }
    }

    #[tokio::test]
    async fn different_keys_have_independent_limits() {
        let limiter = InMemoryRateLimiter::new(3, 60);
        let key1 = RateLimitKey::ip("1.1.1.1");
        let key2 = RateLimitKey::ip("2.2.2.2");

        for _ in 0..3 {
            limiter.check(key1.clone()).await.unwrap();
        }
        assert!(limiter.check(key1.clone()).await.unwrap().is_denied());
        assert!(limiter.check(key2.clone()).await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn same_identifier_in_different_scopes_is_independent() {
        let limiter = InMemoryRateLimiter::new(1, 60);
        limiter.check(RateLimitKey::ip("x")).await.unwrap();
        assert!(limiter
            .check(RateLimitKey::api_key("x"))
            .await
            .unwrap()
            .is_allowed());
    }

    #[tokio::test]
    async fn window_expiry_restores_budget() {
        let limiter = InMemoryRateLimiter::new(1, 1);
        let key = RateLimitKey::ip("10.0.0.3");

        assert!(limiter.check(key.clone()).await.unwrap().is_allowed());
        assert!(limiter.check(key.clone()).await.unwrap().is_denied());

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert!(limiter.check(key.clone()).await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn purge_drops_only_expired_windows() {
        let fresh = InMemoryRateLimiter::new(5, 60);
        fresh.check(RateLimitKey::ip("old")).await.unwrap();
        assert_eq!(fresh.purge_expired().await.unwrap(), 0);

        let limiter = InMemoryRateLimiter::new(5, 1);
        limiter.check(RateLimitKey::ip("old")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(2100)).await;
        limiter.check(RateLimitKey::ip("new")).await.unwrap();

        assert_eq!(limiter.purge_expired().await.unwrap(), 1);
        assert_eq!(limiter.tracked_keys().await, 1);
    }

    #[test]
    fn builds_from_security_config() {
        let config = SecurityConfig {
            rate_limit_requests: 7,
            ..Default::default()
        };
        assert_eq!(InMemoryRateLimiter::from_config(&config).limit(), 7);
    }
}
