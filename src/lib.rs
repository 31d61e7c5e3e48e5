//! Canopy - real-time monitoring service for cascade-correlation training.
//!
//! Exposes one training backend (an in-process demo simulator or a remote
//! training service) over a REST API and a WebSocket stream, behind
//! API-key authentication and per-caller rate limiting.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
