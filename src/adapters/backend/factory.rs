//! Backend selection.
//!
//! Selection order, highest priority first:
//! 1. a truthy demo flag selects the demo backend
//! 2. a configured service URL selects the service backend
//! 3. otherwise the demo backend

use std::sync::Arc;

use super::{DemoBackend, SerializedBackend, ServiceBackend, ServiceConfig};
use crate::config::{BackendConfig, DemoConfig};
use crate::domain::training::{BackendKind, BackendResult};
use crate::ports::TrainingBackend;

/// Decides which backend variant the configuration asks for.
pub fn select_backend(config: &BackendConfig) -> BackendKind {
    if config.demo_mode_enabled() {
        BackendKind::Demo
    } else if config.service_url().is_some() {
        BackendKind::Service
    } else {
        BackendKind::Demo
    }
}

/// Builds the selected backend, wrapped in a [`SerializedBackend`].
///
/// The backend is not initialized; callers run `initialize` themselves.
pub fn create_backend(
    backend: &BackendConfig,
    demo: &DemoConfig,
) -> BackendResult<Arc<dyn TrainingBackend>> {
    let kind = select_backend(backend);

    let inner: Arc<dyn TrainingBackend> = match ServiceConfig::from_backend_config(backend) {
        Some(service) if kind == BackendKind::Service => {
            tracing::info!(url = %service.base_url, "Using service backend");
            Arc::new(ServiceBackend::new(service)?)
        }
        _ => {
            tracing::info!(
                demo_flag = backend.demo_mode_enabled(),
                "Using demo backend"
            );
            Arc::new(DemoBackend::new(demo.clone()))
        }
    };

    Ok(Arc::new(SerializedBackend::new(inner)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TRUTHY_VALUES;
    use proptest::prelude::*;

    fn with(demo_mode: Option<&str>, service_url: Option<&str>) -> BackendConfig {
        BackendConfig {
            demo_mode: demo_mode.map(String::from),
            service_url: service_url.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn truthy_flags_select_demo() {
        for value in TRUTHY_VALUES {
            assert_eq!(
                select_backend(&with(Some(*value), Some("http://trainer:8000"))),
                BackendKind::Demo,
                "flag {:?}",
                value
            );
        }
    }

    #[test]
    fn falsy_flags_defer_to_service_url() {
        for value in ["0", "false", "", "no", "TRUE", "YES", "on"] {
            assert_eq!(
                select_backend(&with(Some(value), Some("http://trainer:8000"))),
                BackendKind::Service,
                "flag {:?}",
                value
            );
        }
    }

    #[test]
    fn demo_is_the_default() {
        assert_eq!(select_backend(&with(None, None)), BackendKind::Demo);
        assert_eq!(select_backend(&with(Some("0"), None)), BackendKind::Demo);
        assert_eq!(select_backend(&with(None, Some("  "))), BackendKind::Demo);
    }

    #[test]
    fn service_url_selects_service() {
        assert_eq!(
            select_backend(&with(None, Some("http://trainer:8000"))),
            BackendKind::Service
        );
    }

    #[tokio::test]
    async fn created_backend_matches_selection() {
        let demo = DemoConfig::default();

        let backend = create_backend(&with(Some("1"), Some("http://trainer:8000")), &demo).unwrap();
        assert_eq!(backend.backend_type(), BackendKind::Demo);

        let backend = create_backend(&with(None, Some("http://trainer:8000")), &demo).unwrap();
        assert_eq!(backend.backend_type(), BackendKind::Service);

        let backend = create_backend(&with(None, None), &demo).unwrap();
        assert_eq!(backend.backend_type(), BackendKind::Demo);
    }

    proptest! {
        #[test]
        fn only_listed_values_are_truthy(flag in "\\PC{0,8}") {
            let kind = select_backend(&with(Some(&flag), Some("http://trainer:8000")));
            let expected = if TRUTHY_VALUES.contains(&flag.as_str()) {
                BackendKind::Demo
            } else {
                BackendKind::Service
            };
            prop_assert_eq!(kind, expected);
        }
    }
}
