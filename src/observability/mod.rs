//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Forwarder and aggregator produce:
//!     → counters.rs (request tallies served by /stats)
//!     → logging.rs (structured log events)
//!     → metrics.rs (Prometheus counters, gauges, histograms)
//!
//! Consumers:
//!     → /stats endpoint (counter snapshot)
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through logs and to backends
//! - Counters and metrics are cheap (atomic increments)

pub mod counters;
pub mod logging;
pub mod metrics;

pub use counters::{percentage, CountersSnapshot, RequestCounters};
