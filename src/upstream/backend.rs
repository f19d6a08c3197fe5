//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single downstream service
//! - Hold its pre-parsed base URL
//! - Hold its timeout classes (data and health)

use std::time::Duration;

use url::Url;

use crate::config::schema::{BackendConfig, TimeoutConfig};
use crate::resilience::TimeoutClass;

/// Error building a backend from configuration.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend {backend:?} has invalid base URL: {source}")]
    InvalidUrl {
        backend: String,
        #[source]
        source: url::ParseError,
    },

    #[error("backend {backend:?} has a zero {class} timeout")]
    ZeroTimeout { backend: String, class: TimeoutClass },

    #[error("duplicate backend {0:?}")]
    Duplicate(String),
}

/// A single downstream service. Immutable after construction.
#[derive(Debug, Clone)]
pub struct Backend {
    /// Identifier used in logs, error bodies and health reports.
    pub name: String,
    /// Parsed base URL; forwarded paths are appended to it.
    pub base_url: Url,
    /// Path probed by the health aggregator.
    pub health_path: String,
    data_timeout: Duration,
    health_timeout: Duration,
}

impl Backend {
    /// Create a backend from its configuration, falling back to the global
    /// timeouts where the backend does not override them.
    pub fn from_config(config: &BackendConfig, defaults: &TimeoutConfig) -> Result<Self, BackendError> {
        let base_url = Url::parse(&config.base_url).map_err(|source| BackendError::InvalidUrl {
            backend: config.name.clone(),
            source,
        })?;

        let data_ms = config.data_timeout_ms.unwrap_or(defaults.data_ms);
        let health_ms = config.health_timeout_ms.unwrap_or(defaults.health_ms);
        for (class, ms) in [(TimeoutClass::Data, data_ms), (TimeoutClass::Health, health_ms)] {
            if ms == 0 {
                return Err(BackendError::ZeroTimeout {
                    backend: config.name.clone(),
                    class,
                });
            }
        }

        Ok(Self {
            name: config.name.clone(),
            base_url,
            health_path: config.health_path.clone(),
            data_timeout: Duration::from_millis(data_ms),
            health_timeout: Duration::from_millis(health_ms),
        })
    }

    /// Deadline for a call of the given class.
    pub fn timeout(&self, class: TimeoutClass) -> Duration {
        match class {
            TimeoutClass::Data => self.data_timeout,
            TimeoutClass::Health => self.health_timeout,
        }
    }

    /// Absolute URL for a backend-relative path (which may carry a query).
    pub fn url_for(&self, path: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }

    /// Absolute URL of the health probe.
    pub fn health_url(&self) -> String {
        self.url_for(&self.health_path)
    }
}
