//! Service Gateway Library
//!
//! A reverse-proxy/aggregation gateway in front of a users service and an
//! orders service, plus in-memory demo implementations of both services.

// Core subsystems
pub mod config;
pub mod error;
pub mod http;
pub mod proxy;
pub mod routing;
pub mod upstream;

// Aggregation
pub mod health;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

// Demo backends
pub mod services;

pub use config::schema::GatewayConfig;
pub use error::{GatewayError, TransportError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
