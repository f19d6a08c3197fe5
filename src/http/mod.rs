//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, local endpoints)
//!     → request.rs (assign and propagate request ID)
//!     → routing table decides route and backend
//!     → proxy forwarder calls the backend
//!     → response.rs (relay or synthesize JSON)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::ProxiedResponse;
pub use server::{serve, AppState, HttpServer, ServerError};
