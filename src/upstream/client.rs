//! HTTP client for backend calls.
//!
//! # Responsibilities
//! - Issue one HTTP exchange against `backend.base_url + path`
//! - Bound the whole exchange (connect, send, read body) by a timeout class
//! - Classify transport failures as Timeout / Unreachable / Unknown
//!
//! # Design Decisions
//! - Backend 4xx/5xx are successful exchanges here; status and body are
//!   returned untouched
//! - One pooled hyper client shared by all requests
//! - No retries

use axum::body::{Body, Bytes};
use axum::http::{header, Method, Request, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::error::TransportError;
use crate::http::request::X_REQUEST_ID;
use crate::http::response::{ProxiedResponse, APPLICATION_JSON};
use crate::resilience::{bounded, TimeoutClass, TimedOut};
use crate::upstream::backend::Backend;

/// One call to issue against a backend.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    pub method: Method,
    /// Backend-relative path, optionally with a query string.
    pub path: String,
    pub body: Option<Bytes>,
    pub request_id: Option<String>,
}

impl BackendRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            request_id: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }
}

/// Shared HTTP client for all backends.
#[derive(Clone)]
pub struct BackendClient {
    client: Client<HttpConnector, Body>,
    max_body_bytes: usize,
}

impl BackendClient {
    /// Create a client that buffers at most `max_body_bytes` of any backend response.
    pub fn new(max_body_bytes: usize) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self {
            client,
            max_body_bytes,
        }
    }

    /// Perform one exchange with `backend` under the deadline for `class`.
    pub async fn call(
        &self,
        backend: &Backend,
        class: TimeoutClass,
        request: BackendRequest,
    ) -> Result<ProxiedResponse, TransportError> {
        let url = backend.url_for(&request.path);
        let uri: Uri = url
            .parse()
            .map_err(|e| TransportError::Unknown(format!("invalid upstream URI {}: {}", url, e)))?;

        let mut builder = Request::builder()
            .method(request.method)
            .uri(uri)
            .header(header::ACCEPT, APPLICATION_JSON)
            .header(header::USER_AGENT, concat!("service-gateway/", env!("CARGO_PKG_VERSION")));
        if let Some(id) = &request.request_id {
            builder = builder.header(X_REQUEST_ID, id.as_str());
        }
        let body = match request.body {
            Some(bytes) => {
                builder = builder.header(header::CONTENT_TYPE, APPLICATION_JSON);
                Body::from(bytes)
            }
            None => Body::empty(),
        };
        let outbound = builder
            .body(body)
            .map_err(|e| TransportError::Unknown(format!("failed to build upstream request: {}", e)))?;

        let exchange = async {
            let response: hyper::Response<hyper::body::Incoming> =
                self.client.request(outbound).await.map_err(classify)?;
            let status = response.status();
            let body = axum::body::to_bytes(Body::new(response.into_body()), self.max_body_bytes)
                .await
                .map_err(|e| TransportError::Unknown(format!("failed reading backend response: {}", e)))?;
            Ok::<ProxiedResponse, TransportError>(ProxiedResponse::json_bytes(status, body))
        };

        match bounded(backend.timeout(class), exchange).await {
            Ok(result) => result,
            Err(TimedOut(limit)) => Err(TransportError::Timeout(limit)),
        }
    }

    /// Probe the backend's health path under the health deadline.
    pub async fn probe(&self, backend: &Backend) -> Result<ProxiedResponse, TransportError> {
        self.call(backend, TimeoutClass::Health, BackendRequest::get(backend.health_path.clone()))
            .await
    }
}

fn classify(err: hyper_util::client::legacy::Error) -> TransportError {
    let detail = error_chain(&err);
    if err.is_connect() {
        TransportError::Unreachable(detail)
    } else {
        TransportError::Unknown(detail)
    }
}

/// Flatten an error and its sources into one line.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
