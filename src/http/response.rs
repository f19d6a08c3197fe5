//! Response handling and transformation.
//!
//! # Responsibilities
//! - Carry backend responses back to the client unchanged (`ProxiedResponse`)
//! - Synthesize the JSON error body every gateway-side failure uses
//! - Map gateway errors to HTTP status codes
//!
//! # Design Decisions
//! - Relayed bodies are buffered bytes, never re-parsed
//! - Relayed and synthesized responses are always `application/json`
//! - Every error body carries `gateway`, `error` and `timestamp`

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::error::GatewayError;

/// Content type of everything the gateway returns.
pub const APPLICATION_JSON: &str = "application/json";

/// A response ready to hand back to the client: either a backend's answer
/// passed through, or a body the gateway synthesized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxiedResponse {
    pub status: StatusCode,
    pub body: Bytes,
    pub content_type: &'static str,
}

impl ProxiedResponse {
    /// Relay raw bytes with a fixed JSON content type.
    pub fn json_bytes(status: StatusCode, body: Bytes) -> Self {
        Self {
            status,
            body,
            content_type: APPLICATION_JSON,
        }
    }

    /// Serialize a JSON value as the body.
    pub fn json(status: StatusCode, value: &Value) -> Self {
        Self::json_bytes(status, Bytes::from(value.to_string()))
    }

    /// Parse the body as JSON (used by tests and the CLI-facing handlers).
    pub fn body_json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

impl IntoResponse for ProxiedResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(self.content_type));
        response
    }
}

/// Current time in RFC 3339 with millisecond precision.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// JSON body describing a gateway-side failure.
pub fn error_body(gateway: &str, err: &GatewayError) -> Value {
    let mut body = json!({
        "gateway": gateway,
        "error": err.public_message(),
    });

    match err {
        GatewayError::RouteNotFound { path } => {
            body["path"] = json!(path);
        }
        GatewayError::MethodNotAllowed { method, path, allowed } => {
            body["path"] = json!(path);
            body["method"] = json!(method.as_str());
            body["allowed"] = json!(allowed.iter().map(|m| m.as_str()).collect::<Vec<_>>());
        }
        GatewayError::Transport { backend, backend_url, .. } => {
            body["service"] = json!(backend);
            body["service_url"] = json!(backend_url);
        }
        _ => {}
    }

    body["timestamp"] = json!(timestamp());
    body
}

/// Full error response, including the `Allow` header on 405s.
pub fn error_response(gateway: &str, err: &GatewayError) -> Response {
    let mut response = ProxiedResponse::json(err.status(), &error_body(gateway, err)).into_response();

    if let GatewayError::MethodNotAllowed { allowed, .. } = err {
        let allow = allowed.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
        if let Ok(value) = HeaderValue::from_str(&allow) {
            response.headers_mut().insert(header::ALLOW, value);
        }
    }
    response
}
