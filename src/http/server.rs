//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the gateway's own endpoints
//! - Dispatch everything else to the route table and forwarder
//! - Wire up middleware (tracing, request ID, panic catching, deadline)
//! - Serve on a listener until shutdown is signalled
//!
//! # Design Decisions
//! - The request deadline is a backstop behind the backend timeout classes;
//!   when it fires the client still gets the JSON error contract

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Method, Request, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, TransportError};
use crate::health::aggregate_health;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::{error_response, timestamp};
use crate::observability::{metrics, RequestCounters};
use crate::proxy::{Forwarder, InboundRequest};
use crate::resilience::{bounded, TimedOut};
use crate::routing::router::RouteTableError;
use crate::routing::{Resolution, RouteTable};
use crate::upstream::{BackendClient, BackendError, BackendRegistry};

/// Errors building the server from configuration.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Routes(#[from] RouteTableError),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub routes: Arc<RouteTable>,
    pub backends: Arc<BackendRegistry>,
    pub forwarder: Forwarder,
    pub started_at: Instant,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, ServerError> {
        let backends = Arc::new(BackendRegistry::from_config(&config)?);
        let routes = Arc::new(RouteTable::from_config(&config.routes, &backends)?);
        let counters = Arc::new(RequestCounters::with_groups(routes.groups()));
        let client = BackendClient::new(config.limits.max_body_bytes);
        let forwarder = Forwarder::new(config.service_name.as_str(), client, counters)
            .with_body_limit(config.limits.max_body_bytes);

        let state = AppState {
            config: Arc::new(config),
            routes,
            backends,
            forwarder,
            started_at: Instant::now(),
        };

        let router = Self::build_router(&state);
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: &AppState) -> Router {
        let config = &state.config;
        let gateway: Arc<str> = Arc::from(config.service_name.as_str());

        Router::new()
            .route("/", get(home).fallback(local_method_not_allowed))
            .route("/health", get(health).fallback(local_method_not_allowed))
            .route("/stats", get(stats).fallback(local_method_not_allowed))
            .fallback(proxy_handler)
            .with_state(state.clone())
            .layer(middleware::from_fn_with_state(state.clone(), request_deadline))
            .layer(CatchPanicLayer::custom(move |panic: Box<dyn Any + Send + 'static>| {
                panic_response(&gateway, panic)
            }))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Shared handler state (counters, routes, backends).
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        serve(self.router, listener, shutdown).await
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.state.config
    }
}

/// Serve `router` until a shutdown message arrives, then drain in-flight
/// requests.
pub async fn serve(
    router: Router,
    listener: TcpListener,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "HTTP server starting");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            // With every sender gone nothing can ask us to stop.
            if let Err(broadcast::error::RecvError::Closed) = shutdown.recv().await {
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown signal received, draining connections");
        })
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Gateway description, managed backends and endpoint catalog.
async fn home(State(state): State<AppState>) -> Json<Value> {
    let mut endpoints = vec![
        json!({"path": "/", "methods": ["GET"], "description": "Gateway information"}),
        json!({"path": "/health", "methods": ["GET"], "description": "Aggregated health of all services"}),
        json!({"path": "/stats", "methods": ["GET"], "description": "Gateway request statistics"}),
    ];
    for route in state.routes.routes() {
        endpoints.push(json!({
            "path": route.pattern(),
            "methods": route.methods().iter().map(Method::as_str).collect::<Vec<_>>(),
            "backend": route.backend.name,
            "description": route.description,
        }));
    }

    Json(json!({
        "service": state.config.service_name,
        "version": env!("CARGO_PKG_VERSION"),
        "description": "API Gateway forwarding to backend microservices",
        "managed_services": managed_services(&state),
        "endpoints": endpoints,
        "timestamp": timestamp(),
    }))
}

/// Aggregated backend health: 200 when all are healthy, 503 otherwise.
async fn health(State(state): State<AppState>) -> Response {
    let report = aggregate_health(state.forwarder.client(), state.backends.all_backends()).await;
    (report.http_status(), Json(report)).into_response()
}

/// Read-only counter snapshot.
async fn stats(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.forwarder.counters().snapshot();
    Json(json!({
        "gateway": state.config.service_name,
        "success_rate": snapshot.success_rate(),
        "request_statistics": snapshot,
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "managed_services": managed_services(&state),
        "timestamp": timestamp(),
    }))
}

fn managed_services(state: &AppState) -> Vec<String> {
    state
        .backends
        .all_backends()
        .iter()
        .map(|b| b.name.clone())
        .collect()
}

/// 405 for the gateway's own GET-only endpoints.
async fn local_method_not_allowed(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    let err = GatewayError::MethodNotAllowed {
        method,
        path: uri.path().to_string(),
        allowed: vec![Method::GET],
    };
    error_response(&state.config.service_name, &err)
}

/// Resolve the path against the route table and forward.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let gateway = state.config.service_name.as_str();
    let (parts, body) = request.into_parts();
    let path = parts.uri.path().to_string();
    let request_id = request_id(&parts.headers);

    let matched = match state.routes.resolve(&path, &parts.method) {
        Resolution::Matched(matched) => matched,
        Resolution::MethodNotAllowed { allowed } => {
            tracing::warn!(request_id = ?request_id, method = %parts.method, path = %path, "Method not allowed");
            metrics::record_request(parts.method.as_str(), 405, "none", start);
            let err = GatewayError::MethodNotAllowed {
                method: parts.method,
                path,
                allowed,
            };
            return error_response(gateway, &err);
        }
        Resolution::NotFound => {
            tracing::warn!(request_id = ?request_id, path = %path, "No route matched");
            metrics::record_request(parts.method.as_str(), 404, "none", start);
            return error_response(gateway, &GatewayError::RouteNotFound { path });
        }
    };

    let inbound = InboundRequest::new(parts.method.clone())
        .with_query(parts.uri.query().map(str::to_string))
        .with_declared_length(content_length(&parts.headers))
        .with_request_id(request_id)
        .with_body(body);

    state.forwarder.forward(&matched, inbound).await.into_response()
}

fn content_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// Outer bound on every request. Backend calls have tighter deadlines of
/// their own, so this only fires when those are misconfigured or a local
/// handler stalls.
async fn request_deadline(State(state): State<AppState>, request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let limit = Duration::from_secs(state.config.timeouts.request_secs);
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let TimedOut(limit) = match bounded(limit, next.run(request)).await {
        Ok(response) => return response,
        Err(elapsed) => elapsed,
    };

    let gateway = state.config.service_name.as_str();
    match state.routes.resolve(&path, &method) {
        // The forwarder counted the attempt before its first await, and its
        // future was dropped before it could count the failure.
        Resolution::Matched(matched) => {
            state.forwarder.counters().record_error();
            let backend = matched.backend();
            tracing::error!(backend = %backend.name, path = %path, limit = ?limit, "Request deadline exceeded");
            metrics::record_request(method.as_str(), 504, &backend.name, start);
            error_response(
                gateway,
                &GatewayError::Transport {
                    backend: backend.name.clone(),
                    backend_url: backend.base_url.to_string(),
                    source: TransportError::Timeout(limit),
                },
            )
        }
        _ => {
            tracing::error!(path = %path, limit = ?limit, "Request deadline exceeded");
            error_response(gateway, &GatewayError::RequestTimeout(limit))
        }
    }
}

/// Convert a handler panic into the JSON 500 body.
fn panic_response(gateway: &str, panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "Handler panicked");

    error_response(gateway, &GatewayError::Internal(detail))
}
