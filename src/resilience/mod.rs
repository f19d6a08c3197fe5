//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (enforce data or health deadline)
//!     → On failure: classified by the backend client, mapped by the forwarder
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retries: a failed call is reported immediately
//! - No circuit breaking beyond the fixed timeout

pub mod timeouts;

pub use timeouts::{bounded, TimeoutClass, TimedOut};
