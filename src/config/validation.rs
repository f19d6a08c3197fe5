//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (the loader handles parsing)
//! - Check referential integrity (routes reference existing backends)
//! - Validate value ranges (timeouts > 0, parseable addresses and URLs)
//! - Keep backend timeouts inside the overall request deadline
//! - Detect conflicting routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::Method;
use thiserror::Error;
use url::Url;

use crate::config::schema::{GatewayConfig, ServiceConfig};
use crate::observability::counters::RESERVED_KEYS;
use crate::routing::matcher::PathPattern;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("service name must not be empty")]
    EmptyServiceName,

    #[error("invalid bind address {0:?}")]
    BindAddress(String),

    #[error("{field} timeout must be greater than zero")]
    ZeroTimeout { field: String },

    #[error("{field} timeout of {value_ms}ms must be shorter than the {request_secs}s request deadline")]
    TimeoutExceedsRequest {
        field: String,
        value_ms: u64,
        request_secs: u64,
    },

    #[error("max body size must be greater than zero")]
    ZeroBodyLimit,

    #[error("backend name must not be empty")]
    EmptyBackendName,

    #[error("duplicate backend {0:?}")]
    DuplicateBackend(String),

    #[error("backend {backend:?} has invalid base URL {url:?}: {reason}")]
    BaseUrl {
        backend: String,
        url: String,
        reason: String,
    },

    #[error("backend {backend:?} health path {path:?} must start with '/'")]
    HealthPath { backend: String, path: String },

    #[error("route {route:?}: {reason}")]
    Route { route: String, reason: String },
}

/// Validate a gateway configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.service_name.trim().is_empty() {
        errors.push(ValidationError::EmptyServiceName);
    }
    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    for (field, value) in [
        ("data", config.timeouts.data_ms),
        ("health", config.timeouts.health_ms),
        ("request", config.timeouts.request_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout { field: field.to_string() });
        }
    }

    let request_secs = config.timeouts.request_secs;
    let mut within_deadline = |field: String, value_ms: u64| {
        if request_secs > 0 && value_ms >= request_secs.saturating_mul(1000) {
            errors.push(ValidationError::TimeoutExceedsRequest {
                field,
                value_ms,
                request_secs,
            });
        }
    };
    within_deadline("data".to_string(), config.timeouts.data_ms);
    within_deadline("health".to_string(), config.timeouts.health_ms);
    for backend in &config.backends {
        for (class, value) in [
            ("data", backend.data_timeout_ms),
            ("health", backend.health_timeout_ms),
        ] {
            if let Some(value) = value {
                within_deadline(format!("{} {}", backend.name, class), value);
            }
        }
    }

    let mut names = HashSet::new();
    for backend in &config.backends {
        if backend.name.trim().is_empty() {
            errors.push(ValidationError::EmptyBackendName);
        } else if !names.insert(backend.name.as_str()) {
            errors.push(ValidationError::DuplicateBackend(backend.name.clone()));
        }

        if let Err(reason) = check_base_url(&backend.base_url) {
            errors.push(ValidationError::BaseUrl {
                backend: backend.name.clone(),
                url: backend.base_url.clone(),
                reason,
            });
        }

        if !backend.health_path.starts_with('/') {
            errors.push(ValidationError::HealthPath {
                backend: backend.name.clone(),
                path: backend.health_path.clone(),
            });
        }

        for (class, value) in [
            ("data", backend.data_timeout_ms),
            ("health", backend.health_timeout_ms),
        ] {
            if value == Some(0) {
                errors.push(ValidationError::ZeroTimeout {
                    field: format!("{} {}", backend.name, class),
                });
            }
        }
    }

    let mut patterns = HashSet::new();
    for route in &config.routes {
        let mut fail = |reason: String| {
            errors.push(ValidationError::Route {
                route: route.name.clone(),
                reason,
            })
        };

        if !names.contains(route.backend.as_str()) {
            fail(format!("unknown backend {:?}", route.backend));
        }
        if route.group.trim().is_empty() {
            fail("group must not be empty".to_string());
        } else if RESERVED_KEYS.contains(&route.group.as_str()) {
            fail(format!("group {:?} is reserved", route.group));
        }
        if route.methods.is_empty() {
            fail("at least one method is required".to_string());
        }
        for method in &route.methods {
            if method.parse::<Method>().is_err() {
                fail(format!("invalid method {:?}", method));
            }
        }

        match PathPattern::parse(&route.pattern) {
            Ok(pattern) => {
                if !patterns.insert(pattern.shape()) {
                    fail(format!("pattern {:?} conflicts with an earlier route", route.pattern));
                }
                if let Some(target) = &route.target {
                    if let Err(e) = pattern.check_template(target) {
                        fail(e.to_string());
                    }
                }
            }
            Err(e) => fail(e.to_string()),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a demo service configuration.
pub fn validate_service_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.service_name.trim().is_empty() {
        errors.push(ValidationError::EmptyServiceName);
    }
    if config.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.bind_address.clone()));
    }
    if let Err(reason) = check_base_url(&config.users_service_url) {
        errors.push(ValidationError::BaseUrl {
            backend: "users".to_string(),
            url: config.users_service_url.clone(),
            reason,
        });
    }
    for (field, value) in [
        ("dependency", config.dependency_timeout_ms),
        ("health", config.health_timeout_ms),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout { field: field.to_string() });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_base_url(raw: &str) -> Result<(), String> {
    if raw.trim().is_empty() {
        return Err("must not be empty".to_string());
    }
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme {:?}", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{BackendConfig, RouteConfig};

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&GatewayConfig::default()), Ok(()));
    }

    #[test]
    fn collects_every_error() {
        let mut config = GatewayConfig::default();
        config.service_name = String::new();
        config.timeouts.health_ms = 0;
        config.backends.push(BackendConfig::new("users", "ftp://files"));

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::EmptyServiceName));
        assert!(errors.contains(&ValidationError::ZeroTimeout { field: "health".into() }));
        assert!(errors.contains(&ValidationError::DuplicateBackend("users".into())));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::BaseUrl { .. })));
    }

    #[test]
    fn backend_timeouts_must_fit_request_deadline() {
        let mut config = GatewayConfig::default();
        config.timeouts.request_secs = 1;
        config.timeouts.data_ms = 5000;
        config.timeouts.health_ms = 999;
        config.backends[0].health_timeout_ms = Some(1000);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::TimeoutExceedsRequest {
                    field: "data".into(),
                    value_ms: 5000,
                    request_secs: 1,
                },
                ValidationError::TimeoutExceedsRequest {
                    field: "users health".into(),
                    value_ms: 1000,
                    request_secs: 1,
                },
            ]
        );
    }

    #[test]
    fn route_must_reference_known_backend() {
        let mut config = GatewayConfig::default();
        config.routes.push(RouteConfig::new("payments", "/payments", &["GET"], "payments", "payments"));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("unknown backend"));
    }

    #[test]
    fn reserved_group_names_rejected() {
        let mut config = GatewayConfig::default();
        config.routes.push(RouteConfig::new("t", "/totals", &["GET"], "users", "total"));

        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("reserved"));
    }

    #[test]
    fn conflicting_patterns_rejected() {
        let mut config = GatewayConfig::default();
        config.routes.push(RouteConfig::new("dup", "/users/{user}", &["PATCH"], "users", "users"));

        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("conflicts"));
    }

    #[test]
    fn target_template_params_must_exist() {
        let mut config = GatewayConfig::default();
        let mut route = RouteConfig::new("legacy", "/legacy/{id}", &["GET"], "users", "users");
        route.target = Some("/users/{user_id}".into());
        config.routes.push(route);

        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("user_id"));
    }
}
