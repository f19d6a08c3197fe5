//! Request forwarding.
//!
//! # Responsibilities
//! - Count every forwarding attempt before anything can fail
//! - Read, bound and validate the body for POST/PUT only
//! - Relay the backend's status and body unchanged
//! - Convert transport failures into 504/503/500 JSON responses
//!
//! # Design Decisions
//! - Single attempt; a failed call is reported immediately
//! - The error counter moves at most once per request
//! - The inbound body is read here, after counting, so an oversized or
//!   stalled body is a counted failure like any other
//! - Counters are the only shared state this module touches

use std::sync::Arc;
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::http::Method;
use futures_util::StreamExt;
use serde::de::IgnoredAny;

use crate::error::GatewayError;
use crate::http::response::{error_body, ProxiedResponse};
use crate::observability::{metrics, RequestCounters};
use crate::resilience::{bounded, TimeoutClass, TimedOut};
use crate::routing::RouteMatch;
use crate::upstream::{Backend, BackendClient, BackendRequest};

/// Default cap on an inbound body (2MB).
const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// What the forwarder needs from the inbound request.
#[derive(Debug)]
pub struct InboundRequest {
    pub method: Method,
    /// Raw query string, without the leading `?`.
    pub query: Option<String>,
    /// Unread body; only consumed for POST/PUT.
    pub body: Body,
    /// Length the client declared in `Content-Length`, if any.
    pub declared_length: Option<usize>,
    pub request_id: Option<String>,
}

impl InboundRequest {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            query: None,
            body: Body::empty(),
            declared_length: None,
            request_id: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_declared_length(mut self, length: Option<usize>) -> Self {
        self.declared_length = length;
        self
    }

    pub fn with_query(mut self, query: Option<String>) -> Self {
        self.query = query.filter(|q| !q.is_empty());
        self
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }
}

/// Only POST and PUT carry a body to the backend.
pub fn carries_body(method: &Method) -> bool {
    method == Method::POST || method == Method::PUT
}

/// Executes proxied calls and keeps the request counters.
#[derive(Clone)]
pub struct Forwarder {
    gateway: Arc<str>,
    client: BackendClient,
    counters: Arc<RequestCounters>,
    max_body_bytes: usize,
}

impl Forwarder {
    pub fn new(gateway: impl Into<Arc<str>>, client: BackendClient, counters: Arc<RequestCounters>) -> Self {
        Self {
            gateway: gateway.into(),
            client,
            counters,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Cap on the inbound body; larger bodies get a 413.
    pub fn with_body_limit(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn counters(&self) -> &Arc<RequestCounters> {
        &self.counters
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    /// Forward one request to the matched route's backend.
    ///
    /// Always yields a response: the backend's own, or a gateway error body.
    pub async fn forward(&self, matched: &RouteMatch, inbound: InboundRequest) -> ProxiedResponse {
        match self.try_forward(matched, inbound).await {
            Ok(response) => response,
            Err(err) => ProxiedResponse::json(err.status(), &error_body(&self.gateway, &err)),
        }
    }

    async fn try_forward(
        &self,
        matched: &RouteMatch,
        inbound: InboundRequest,
    ) -> Result<ProxiedResponse, GatewayError> {
        let start = Instant::now();
        let route = &matched.route;
        let backend = matched.backend();

        self.counters.record_attempt(&route.group);

        let mut path = matched.target_path.clone();
        if let Some(query) = &inbound.query {
            path.push('?');
            path.push_str(query);
        }

        let mut request = BackendRequest::new(inbound.method.clone(), path)
            .with_request_id(inbound.request_id.clone());

        if carries_body(&inbound.method) {
            let body = self
                .read_body(backend, inbound.body, inbound.declared_length)
                .await
                .and_then(|body| validate_json(&body).map(|_| body));
            match body {
                Ok(body) if body.is_empty() => {}
                Ok(body) => request = request.with_body(body),
                Err(err) => {
                    self.counters.record_error();
                    tracing::warn!(
                        request_id = ?inbound.request_id,
                        route = %route.name,
                        error = %err,
                        "Request body rejected"
                    );
                    return Err(err);
                }
            }
        }

        tracing::debug!(
            request_id = ?inbound.request_id,
            route = %route.name,
            backend = %backend.name,
            method = %inbound.method,
            path = %request.path,
            "Forwarding request"
        );

        match self.client.call(backend, TimeoutClass::Data, request).await {
            Ok(response) => {
                metrics::record_request(
                    inbound.method.as_str(),
                    response.status.as_u16(),
                    &backend.name,
                    start,
                );
                Ok(response)
            }
            Err(source) => {
                self.counters.record_error();
                let status = source.status();
                tracing::error!(
                    request_id = ?inbound.request_id,
                    backend = %backend.name,
                    kind = source.kind(),
                    error = %source,
                    "Upstream error"
                );
                metrics::record_request(inbound.method.as_str(), status.as_u16(), &backend.name, start);
                Err(GatewayError::Transport {
                    backend: backend.name.clone(),
                    backend_url: backend.base_url.to_string(),
                    source,
                })
            }
        }
    }

    /// Buffer the inbound body under the size cap and the backend's data deadline.
    async fn read_body(
        &self,
        backend: &Backend,
        body: Body,
        declared_length: Option<usize>,
    ) -> Result<Bytes, GatewayError> {
        let limit = self.max_body_bytes;
        if declared_length.is_some_and(|len| len > limit) {
            return Err(GatewayError::PayloadTooLarge { limit });
        }

        match bounded(backend.timeout(TimeoutClass::Data), collect_body(body, limit)).await {
            Ok(result) => result,
            Err(TimedOut(after)) => Err(GatewayError::BodyTimeout(after)),
        }
    }
}

/// Collect a body stream, failing as soon as it grows past `limit` bytes.
async fn collect_body(body: Body, limit: usize) -> Result<Bytes, GatewayError> {
    let mut stream = body.into_data_stream();
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| GatewayError::BodyRead(e.to_string()))?;
        if buffer.len() + chunk.len() > limit {
            return Err(GatewayError::PayloadTooLarge { limit });
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(Bytes::from(buffer))
}

/// An empty body is fine; anything else must parse as JSON.
fn validate_json(body: &Bytes) -> Result<(), GatewayError> {
    if body.is_empty() {
        return Ok(());
    }
    serde_json::from_slice::<IgnoredAny>(body)
        .map(|_| ())
        .map_err(|e| GatewayError::MalformedRequestBody(e.to_string()))
}
