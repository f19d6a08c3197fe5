//! Upstream (backend) subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched → backend identified
//!     → registry.rs (look up the backend by name)
//!     → client.rs (one bounded HTTP exchange)
//!     → Return: ProxiedResponse | TransportError
//! ```
//!
//! # Design Decisions
//! - Exactly one instance per backend; no load balancing
//! - Backends are immutable after start-up and shared via Arc
//! - Two timeout classes per backend: data and health

pub mod backend;
pub mod client;
pub mod registry;

pub use backend::{Backend, BackendError};
pub use client::{BackendClient, BackendRequest};
pub use registry::BackendRegistry;
