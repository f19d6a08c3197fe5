//! Error taxonomy for the gateway boundary.
//!
//! Transport failures are produced by the backend client and converted by the
//! forwarder; everything else is raised by the HTTP layer itself. Upstream HTTP
//! error statuses are not errors here: they are relayed verbatim.

use std::time::Duration;

use axum::http::{Method, StatusCode};
use thiserror::Error;

/// Failure to complete an HTTP exchange with a backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Connection refused, DNS failure, host unreachable.
    #[error("unreachable: {0}")]
    Unreachable(String),

    #[error("{0}")]
    Unknown(String),
}

impl TransportError {
    /// Gateway status this failure maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            TransportError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            TransportError::Unreachable(_) => StatusCode::SERVICE_UNAVAILABLE,
            TransportError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Timeout(_) => "timeout",
            TransportError::Unreachable(_) => "unreachable",
            TransportError::Unknown(_) => "unknown",
        }
    }
}

/// Errors answered by the gateway itself.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no route for {path}")]
    RouteNotFound { path: String },

    #[error("method {method} not allowed on {path}")]
    MethodNotAllowed {
        method: Method,
        path: String,
        allowed: Vec<Method>,
    },

    #[error("backend {backend} failed: {source}")]
    Transport {
        backend: String,
        backend_url: String,
        #[source]
        source: TransportError,
    },

    #[error("malformed request body: {0}")]
    MalformedRequestBody(String),

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("request body not received within {0:?}")]
    BodyTimeout(Duration),

    #[error("failed reading request body: {0}")]
    BodyRead(String),

    #[error("request not completed within {0:?}")]
    RequestTimeout(Duration),

    #[error("internal gateway error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::Transport { source, .. } => source.status(),
            GatewayError::MalformedRequestBody(_) => StatusCode::BAD_REQUEST,
            GatewayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::BodyTimeout(_) => StatusCode::REQUEST_TIMEOUT,
            GatewayError::BodyRead(_) => StatusCode::BAD_REQUEST,
            GatewayError::RequestTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the `error` field of the response body.
    pub fn public_message(&self) -> String {
        match self {
            GatewayError::RouteNotFound { .. } => "Endpoint not found in gateway".to_string(),
            GatewayError::MethodNotAllowed { method, .. } => {
                format!("Method {} not supported on this endpoint", method)
            }
            GatewayError::Transport { source, .. } => match source {
                TransportError::Timeout(_) => "Timeout connecting to service".to_string(),
                TransportError::Unreachable(_) => "Service unavailable".to_string(),
                TransportError::Unknown(msg) => format!("Error processing request: {}", msg),
            },
            GatewayError::MalformedRequestBody(reason) => {
                format!("Malformed JSON request body: {}", reason)
            }
            GatewayError::PayloadTooLarge { limit } => {
                format!("Request body exceeds {} bytes", limit)
            }
            GatewayError::BodyTimeout(_) => "Timeout reading request body".to_string(),
            GatewayError::BodyRead(reason) => format!("Failed reading request body: {}", reason),
            GatewayError::RequestTimeout(_) => "Gateway timeout".to_string(),
            GatewayError::Internal(_) => "Internal gateway error".to_string(),
        }
    }
}
