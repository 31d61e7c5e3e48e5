//! HTTP middleware for axum.
//!
//! - `security` - API-key authentication and rate limiting

pub mod security;

pub use security::{
    extract_api_key, is_exempt, key_fingerprint, security_middleware, SecurityState,
    EXEMPT_PATHS, EXEMPT_PREFIX,
};
