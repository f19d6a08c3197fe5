//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Select the output format (pretty, compact, JSON)
//! - Configure log level at runtime through `RUST_LOG`
//!
//! # Design Decisions
//! - Uses the tracing crate; every event carries key/value fields
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` wins over the built-in default filter

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

/// Default filter for the gateway binary.
pub const GATEWAY_FILTER: &str = "service_gateway=debug,tower_http=debug";

/// Install the global subscriber.
///
/// `default_filter` applies when `RUST_LOG` is unset or unparseable.
pub fn init_logging(format: LogFormat, default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).init(),
    }
}
