//! Training backend adapters.
//!
//! - [`DemoBackend`] - in-process cascade-correlation simulator
//! - [`ServiceBackend`] - HTTP client for a remote training service
//! - [`SerializedBackend`] - decorator serializing control operations
//! - [`create_backend`] - picks one of the above from configuration

mod demo;
mod factory;
mod serialized;
mod service;
pub mod simulator;

pub use demo::DemoBackend;
pub use factory::{create_backend, select_backend};
pub use serialized::SerializedBackend;
pub use service::{ServiceBackend, ServiceConfig, API_KEY_HEADER};
