//! Service Gateway
//!
//! An API gateway built with Tokio and Axum that fronts the users and orders
//! services.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌───────────────────────────────────────────────────┐
//!                      │                     GATEWAY                       │
//!                      │                                                   │
//!     Client Request   │  ┌─────────┐    ┌──────────┐    ┌───────────┐     │
//!     ─────────────────┼─▶│  http   │───▶│ routing  │───▶│   proxy   │     │
//!                      │  │ server  │    │  table   │    │ forwarder │     │
//!                      │  └────┬────┘    └──────────┘    └─────┬─────┘     │
//!                      │       │                               │           │
//!                      │       │ /health, /stats               ▼           │
//!                      │  ┌────▼─────┐                   ┌───────────┐     │
//!                      │  │  health  │──────────────────▶│ upstream  │─────┼──▶ users / orders
//!                      │  │aggregator│                   │  client   │     │
//!                      │  └──────────┘                   └───────────┘     │
//!                      │                                                   │
//!                      │  Cross-cutting: config, observability (counters,  │
//!                      │  logging, metrics), resilience (timeouts),        │
//!                      │  lifecycle (signals, shutdown)                    │
//!                      └───────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tokio::net::TcpListener;

use service_gateway::config::load_gateway_config;
use service_gateway::http::HttpServer;
use service_gateway::lifecycle::{spawn_signal_listener, Shutdown};
use service_gateway::observability::{logging, metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_gateway_config()?;
    logging::init_logging(config.observability.log_format, logging::GATEWAY_FILTER);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "service-gateway starting");
    tracing::info!(
        service_name = %config.service_name,
        bind_address = %config.listener.bind_address,
        backends = config.backends.len(),
        routes = config.routes.len(),
        data_timeout_ms = config.timeouts.data_ms,
        health_timeout_ms = config.timeouts.health_ms,
        "Configuration loaded"
    );
    for backend in &config.backends {
        tracing::info!(backend = %backend.name, url = %backend.base_url, "Managing backend");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
