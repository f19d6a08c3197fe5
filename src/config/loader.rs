//! Configuration loading from the process environment.
//!
//! Every setting has a default in `schema`; environment variables only
//! override. Loaders take a lookup function so callers (and tests) can supply
//! variables without touching the real environment.

use std::fmt::Display;
use std::str::FromStr;

use crate::config::schema::{GatewayConfig, LogFormat, ServiceConfig};
use crate::config::validation::{validate_config, validate_service_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// A variable was present but could not be parsed.
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Invalid { key, value, reason } => {
                write!(f, "Invalid value {:?} for {}: {}", value, key, reason)
            }
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate the gateway configuration from the process environment.
pub fn load_gateway_config() -> Result<GatewayConfig, ConfigError> {
    load_gateway_config_from(|key| std::env::var(key).ok())
}

/// Load and validate the gateway configuration from an arbitrary lookup.
pub fn load_gateway_config_from<F>(lookup: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = GatewayConfig::default();

    if let Some(name) = lookup("SERVICE_NAME") {
        config.service_name = name;
    }
    config.listener.bind_address = bind_address(&lookup, 8000)?;

    for (key, backend) in [("USERS_SERVICE_URL", "users"), ("ORDERS_SERVICE_URL", "orders")] {
        if let Some(url) = lookup(key) {
            if let Some(b) = config.backend_mut(backend) {
                b.base_url = url;
            }
        }
    }

    config.timeouts.data_ms = parse_var(&lookup, "DATA_TIMEOUT_MS", config.timeouts.data_ms)?;
    config.timeouts.health_ms = parse_var(&lookup, "HEALTH_TIMEOUT_MS", config.timeouts.health_ms)?;
    config.timeouts.request_secs =
        parse_var(&lookup, "REQUEST_TIMEOUT_SECS", config.timeouts.request_secs)?;
    config.limits.max_body_bytes =
        parse_var(&lookup, "MAX_BODY_BYTES", config.limits.max_body_bytes)?;

    config.observability.log_format = log_format(&lookup)?;
    config.observability.metrics_enabled =
        parse_var(&lookup, "METRICS_ENABLED", config.observability.metrics_enabled)?;
    if let Some(addr) = lookup("METRICS_ADDRESS") {
        config.observability.metrics_address = addr;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load and validate a demo service configuration from the process environment.
pub fn load_service_config(default_name: &str, default_port: u16) -> Result<ServiceConfig, ConfigError> {
    load_service_config_from(|key| std::env::var(key).ok(), default_name, default_port)
}

/// Load and validate a demo service configuration from an arbitrary lookup.
pub fn load_service_config_from<F>(
    lookup: F,
    default_name: &str,
    default_port: u16,
) -> Result<ServiceConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ServiceConfig {
        service_name: lookup("SERVICE_NAME").unwrap_or_else(|| default_name.to_string()),
        bind_address: bind_address(&lookup, default_port)?,
        ..ServiceConfig::default()
    };

    if let Some(url) = lookup("USERS_SERVICE_URL") {
        config.users_service_url = url;
    }
    config.dependency_timeout_ms =
        parse_var(&lookup, "DEPENDENCY_TIMEOUT_MS", config.dependency_timeout_ms)?;
    config.health_timeout_ms = parse_var(&lookup, "HEALTH_TIMEOUT_MS", config.health_timeout_ms)?;
    config.log_format = log_format(&lookup)?;

    validate_service_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn bind_address<F>(lookup: &F, default_port: u16) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let host = lookup("BIND_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
    let port: u16 = parse_var(lookup, "SERVICE_PORT", default_port)?;
    Ok(format!("{}:{}", host, port))
}

fn log_format<F>(lookup: &F) -> Result<LogFormat, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup("LOG_FORMAT") {
        None => Ok(LogFormat::default()),
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigError::Invalid {
                key: "LOG_FORMAT",
                value,
                reason: "expected one of pretty, compact, json".to_string(),
            }),
        },
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => match value.trim().parse() {
            Ok(parsed) => Ok(parsed),
            Err(e) => Err(ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = load_gateway_config_from(env(&[])).unwrap();
        assert_eq!(config.service_name, "API Gateway");
        assert_eq!(config.listener.bind_address, "0.0.0.0:8000");
        assert_eq!(config.backend("users").unwrap().base_url, "http://users-service:5001");
        assert_eq!(config.timeouts.data_ms, 10_000);
        assert_eq!(config.timeouts.health_ms, 3_000);
    }

    #[test]
    fn environment_overrides() {
        let config = load_gateway_config_from(env(&[
            ("SERVICE_NAME", "Edge"),
            ("SERVICE_PORT", "9000"),
            ("ORDERS_SERVICE_URL", "http://127.0.0.1:6002"),
            ("HEALTH_TIMEOUT_MS", "500"),
            ("LOG_FORMAT", "JSON"),
            ("METRICS_ENABLED", "true"),
        ]))
        .unwrap();

        assert_eq!(config.service_name, "Edge");
        assert_eq!(config.listener.bind_address, "0.0.0.0:9000");
        assert_eq!(config.backend("orders").unwrap().base_url, "http://127.0.0.1:6002");
        assert_eq!(config.timeouts.health_ms, 500);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert!(config.observability.metrics_enabled);
    }

    #[test]
    fn rejects_unparseable_port() {
        let err = load_gateway_config_from(env(&[("SERVICE_PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SERVICE_PORT", .. }));
    }

    #[test]
    fn rejects_empty_backend_url() {
        let err = load_gateway_config_from(env(&[("USERS_SERVICE_URL", "")])).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = load_gateway_config_from(env(&[("DATA_TIMEOUT_MS", "0")])).unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn service_config_uses_defaults() {
        let config = load_service_config_from(env(&[]), "Users Service", 5001).unwrap();
        assert_eq!(config.service_name, "Users Service");
        assert_eq!(config.bind_address, "0.0.0.0:5001");
        assert_eq!(config.dependency_timeout_ms, 5_000);
    }
}
