//! Demo backend services fronted by the gateway.
//!
//! # Data Flow
//! ```text
//! Gateway forwards /users/*  → users.rs  (in-memory user store)
//! Gateway forwards /orders/* → orders.rs (in-memory order store)
//!                                 → users service lookups (enrichment)
//! ```
//!
//! # Design Decisions
//! - Each service guarantees the JSON error contract on its own:
//!   every failure body carries `service`, `error` and `timestamp`
//! - Stores are ordered maps keyed by integer id with an explicit next id
//! - Stores sit behind a tokio `RwLock`; no lock is held across a network call

use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::{FromRef, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Map, Value};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::response::timestamp;

pub mod orders;
pub mod users;

/// Identity string every service response carries as `service`.
#[derive(Debug, Clone)]
pub struct ServiceName(pub Arc<str>);

impl ServiceName {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Failures a demo service reports to its caller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ServiceError {
    #[error("{what} not found")]
    NotFound { what: &'static str, id: u64 },

    #[error("Endpoint not found")]
    EndpointNotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    DependencyUnavailable(String),

    #[error("Internal server error")]
    Internal,
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::NotFound { .. } | ServiceError::EndpointNotFound => StatusCode::NOT_FOUND,
            ServiceError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::DependencyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Attach the reporting service's identity.
    pub fn by(self, service: &ServiceName) -> ApiError {
        ApiError {
            service: service.clone(),
            error: self,
        }
    }
}

/// A `ServiceError` ready to be rendered as the JSON error body.
#[derive(Debug)]
pub struct ApiError {
    pub service: ServiceName,
    pub error: ServiceError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "service": self.service.as_str(),
            "error": self.error.to_string(),
        });
        if let ServiceError::NotFound { what, id } = &self.error {
            body[format!("{}_id", what.to_ascii_lowercase())] = json!(id);
        }
        body["timestamp"] = json!(timestamp());
        (self.error.status(), Json(body)).into_response()
    }
}

/// Parse a path id; anything that is not a non-negative integer names no
/// endpoint.
pub fn parse_id(raw: &str) -> Result<u64, ServiceError> {
    raw.parse().map_err(|_| ServiceError::EndpointNotFound)
}

/// Parse a request body as a non-empty JSON object.
pub fn json_object(body: &[u8], invalid: &str) -> Result<Map<String, Value>, ServiceError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) if !map.is_empty() => Ok(map),
        _ => Err(ServiceError::BadRequest(invalid.to_string())),
    }
}

/// Current date as `YYYY-MM-DD`.
pub fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// 404 for paths no route matches.
pub async fn endpoint_not_found(State(service): State<ServiceName>, uri: Uri) -> ApiError {
    tracing::debug!(path = %uri.path(), "Unknown endpoint");
    ServiceError::EndpointNotFound.by(&service)
}

/// 405 for known paths hit with an unsupported method.
pub async fn method_not_allowed(State(service): State<ServiceName>, method: Method, uri: Uri) -> ApiError {
    tracing::debug!(method = %method, path = %uri.path(), "Method not allowed");
    ServiceError::MethodNotAllowed.by(&service)
}

/// Shared middleware stack for the demo services.
pub fn with_service_layers<S>(router: Router<S>, service: &ServiceName) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ServiceName: FromRef<S>,
{
    let name = service.clone();
    router
        .fallback(endpoint_not_found)
        .layer(CatchPanicLayer::custom(move |panic: Box<dyn Any + Send + 'static>| {
            let detail = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(panic = %detail, "Handler panicked");
            ServiceError::Internal.by(&name).into_response()
        }))
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(set_request_id_layer())
}
