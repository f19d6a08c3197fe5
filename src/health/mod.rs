//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! GET /health
//!     → aggregator.rs (probe every backend concurrently)
//!     → status.rs (classify each probe, reduce to a verdict)
//!     → HealthReport (200 if healthy, 503 if degraded)
//! ```
//!
//! # Design Decisions
//! - On-demand probes only; no background monitor
//! - Health is per-backend; one instance per backend
//! - The same aggregator serves the gateway and the orders service's
//!   dependency check

pub mod aggregator;
pub mod status;

pub use aggregator::{aggregate_health, HealthReport, ServiceHealth};
pub use status::{BackendStatus, Verdict};
