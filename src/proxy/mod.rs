//! Proxy subsystem.
//!
//! # Data Flow
//! ```text
//! Matched route + inbound request
//!     → forwarder.rs (count, validate body, call backend)
//!     → upstream client (bounded exchange)
//!     → ProxiedResponse (backend answer or gateway error body)
//! ```

pub mod forwarder;

pub use forwarder::{carries_body, Forwarder, InboundRequest};
