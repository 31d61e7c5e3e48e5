//! Rate limiter adapters.
//!
//! - `InMemoryRateLimiter` - fixed-window counters for a single server
//! - `run_purge` - periodic eviction of ended windows
//!
//! ## Usage
//!
//! ```ignore
//! use canopy::adapters::rate_limiter::InMemoryRateLimiter;
//!
//! let limiter = InMemoryRateLimiter::new(100, 60);
//! ```

mod in_memory;
mod purge;

pub use in_memory::InMemoryRateLimiter;
pub use purge::run_purge;
