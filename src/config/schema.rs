//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway
//! and for the demo backend services. All types derive Serde traits so a
//! loaded configuration can be logged or dumped for diagnostics.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Identity string reported in every response body (`gateway` field).
    pub service_name: String,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Downstream services the gateway forwards to.
    pub backends: Vec<BackendConfig>,

    /// Route definitions mapping inbound paths to backends.
    pub routes: Vec<RouteConfig>,

    /// Timeout classes for backend calls.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            service_name: "API Gateway".to_string(),
            listener: ListenerConfig::default(),
            backends: vec![
                BackendConfig::new("users", "http://users-service:5001"),
                BackendConfig::new("orders", "http://orders-service:5002"),
            ],
            routes: default_routes(),
            timeouts: TimeoutConfig::default(),
            limits: LimitsConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Look up a backend definition by name.
    pub fn backend(&self, name: &str) -> Option<&BackendConfig> {
        self.backends.iter().find(|b| b.name == name)
    }

    /// Mutable lookup, used when the environment overrides a base URL.
    pub fn backend_mut(&mut self, name: &str) -> Option<&mut BackendConfig> {
        self.backends.iter_mut().find(|b| b.name == name)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// A downstream service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Unique backend identifier, used in error bodies and health reports.
    pub name: String,

    /// Base URL every forwarded path is appended to.
    pub base_url: String,

    /// Path probed by the health aggregator.
    #[serde(default = "default_health_path")]
    pub health_path: String,

    /// Overrides `timeouts.data_ms` for this backend.
    #[serde(default)]
    pub data_timeout_ms: Option<u64>,

    /// Overrides `timeouts.health_ms` for this backend.
    #[serde(default)]
    pub health_timeout_ms: Option<u64>,
}

impl BackendConfig {
    /// Backend with the default health path and the global timeouts.
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            health_path: default_health_path(),
            data_timeout_ms: None,
            health_timeout_ms: None,
        }
    }
}

fn default_health_path() -> String {
    "/health".to_string()
}

/// Route configuration mapping an inbound path pattern to a backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging.
    pub name: String,

    /// Path pattern; `{param}` segments match any single segment.
    pub pattern: String,

    /// Allowed HTTP methods (upper case).
    pub methods: Vec<String>,

    /// Backend name to forward to.
    pub backend: String,

    /// Counter group this route is tallied under.
    pub group: String,

    /// Backend path template. Defaults to the inbound pattern.
    #[serde(default)]
    pub target: Option<String>,

    /// Human description shown in the endpoint catalog.
    #[serde(default)]
    pub description: String,
}

impl RouteConfig {
    /// Route forwarding to `backend` under the same path, tallied under `group`.
    pub fn new(
        name: impl Into<String>,
        pattern: impl Into<String>,
        methods: &[&str],
        backend: impl Into<String>,
        group: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            methods: methods.iter().map(|m| m.to_string()).collect(),
            backend: backend.into(),
            group: group.into(),
            target: None,
            description: String::new(),
        }
    }

    /// Set the catalog description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// The users/orders route set served by the gateway out of the box.
pub fn default_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig::new("users-collection", "/users", &["GET", "POST"], "users", "users")
            .describe("List users or create a user (Users Service)"),
        RouteConfig::new("users-search", "/users/search/{query}", &["GET"], "users", "users")
            .describe("Search users by name or email"),
        RouteConfig::new("users-item", "/users/{id}", &["GET", "PUT", "DELETE"], "users", "users")
            .describe("Read, update or delete a single user"),
        RouteConfig::new("orders-collection", "/orders", &["GET", "POST"], "orders", "orders")
            .describe("List orders or create an order (Orders Service)"),
        RouteConfig::new("orders-by-user", "/orders/user/{user_id}", &["GET"], "orders", "orders")
            .describe("Orders placed by a specific user"),
        RouteConfig::new("orders-by-status", "/orders/status/{status}", &["GET"], "orders", "orders")
            .describe("Orders filtered by status"),
        RouteConfig::new("orders-item", "/orders/{id}", &["GET", "PUT", "DELETE"], "orders", "orders")
            .describe("Read, update or delete a single order"),
    ]
}

/// Timeout classes for backend calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Forwarded data calls, in milliseconds.
    pub data_ms: u64,

    /// Health probes, in milliseconds.
    pub health_ms: u64,

    /// Outer bound on any inbound request, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            data_ms: 10_000,
            health_ms: 3_000,
            request_secs: 30,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum inbound or upstream body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log line format.
    pub log_format: LogFormat,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Configuration shared by the demo backend services.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Identity string reported as `service` in every body.
    pub service_name: String,

    /// Bind address.
    pub bind_address: String,

    /// Users service base URL (orders service only).
    pub users_service_url: String,

    /// Timeout for service-to-service lookups, in milliseconds.
    pub dependency_timeout_ms: u64,

    /// Timeout for dependency health probes, in milliseconds.
    pub health_timeout_ms: u64,

    /// Log line format.
    pub log_format: LogFormat,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: "Service".to_string(),
            bind_address: "0.0.0.0:5000".to_string(),
            users_service_url: "http://users-service:5001".to_string(),
            dependency_timeout_ms: 5_000,
            health_timeout_ms: 3_000,
            log_format: LogFormat::Pretty,
        }
    }
}
