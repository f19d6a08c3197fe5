//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! process environment (SERVICE_NAME, SERVICE_PORT, *_SERVICE_URL, ...)
//!     → loader.rs (read & parse overrides on top of defaults)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig / ServiceConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow an empty environment
//! - Validation separates parsing from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_gateway_config, load_service_config, ConfigError};
pub use schema::BackendConfig;
pub use schema::GatewayConfig;
pub use schema::LogFormat;
pub use schema::RouteConfig;
pub use schema::ServiceConfig;
