//! Backend registry.
//!
//! # Responsibilities
//! - Own every configured backend, in configuration order
//! - Look backends up by name for route compilation
//! - Hand out the full list for health aggregation

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::upstream::backend::{Backend, BackendError};

/// Read-only set of backends, one per downstream service.
#[derive(Debug, Default)]
pub struct BackendRegistry {
    backends: Vec<Arc<Backend>>,
}

impl BackendRegistry {
    /// Build the registry from configuration.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, BackendError> {
        let mut backends: Vec<Arc<Backend>> = Vec::with_capacity(config.backends.len());

        for backend_config in &config.backends {
            if backends.iter().any(|b| b.name == backend_config.name) {
                return Err(BackendError::Duplicate(backend_config.name.clone()));
            }
            let backend = Backend::from_config(backend_config, &config.timeouts)?;
            tracing::debug!(
                backend = %backend.name,
                base_url = %backend.base_url,
                "Backend registered"
            );
            backends.push(Arc::new(backend));
        }

        Ok(Self { backends })
    }

    /// Look up a backend by name.
    pub fn get(&self, name: &str) -> Option<Arc<Backend>> {
        self.backends.iter().find(|b| b.name == name).cloned()
    }

    /// All backends, in configuration order.
    pub fn all_backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
