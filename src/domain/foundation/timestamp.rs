//! Wall-clock timestamps.
//!
//! Dashboard clients receive time as fractional Unix seconds; rate-limit
//! headers use whole seconds. Both are derived from one UTC instant here.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A UTC instant. Serializes as RFC 3339.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Whole Unix seconds. Out-of-range values clamp to the epoch.
    pub fn from_unix_secs(secs: u64) -> Self {
        let secs = i64::try_from(secs).unwrap_or(i64::MAX);
        Self(
            Utc.timestamp_opt(secs, 0)
                .single()
                .unwrap_or(DateTime::UNIX_EPOCH),
        )
    }

    pub fn as_unix_secs(&self) -> u64 {
        self.0.timestamp().max(0) as u64
    }

    /// Unix seconds with microsecond precision; the `timestamp` wire format.
    pub fn as_unix_secs_f64(&self) -> f64 {
        self.0.timestamp_micros() as f64 / 1_000_000.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}
