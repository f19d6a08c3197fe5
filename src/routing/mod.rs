//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (route lookup)
//!     → matcher.rs (segment match, parameter binding, method check)
//!     → Return: Matched(route, target path) | MethodNotAllowed | NotFound
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Resolve backend references
//!     → Compile path patterns and rewrite templates
//!     → Sort by specificity
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (segment matching only)
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod router;

pub use router::{Resolution, Route, RouteMatch, RouteTable};
