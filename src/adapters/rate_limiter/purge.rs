//! Background eviction of ended rate-limit windows.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::ports::RateLimiter;

/// Purges expired buckets every `interval` until cancelled.
///
/// Buckets are created per client, so without this the map keeps one entry
/// for every address or key ever seen.
pub async fn run_purge(
    limiter: Arc<dyn RateLimiter>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let start = tokio::time::Instant::now() + interval;
    let mut ticker = tokio::time::interval_at(start, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => match limiter.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, "Purged expired rate-limit windows"),
                Err(e) => tracing::warn!(error = %e, "Rate-limit purge failed"),
            },
        }
    }
    tracing::debug!("Rate-limit purge stopped");
}
