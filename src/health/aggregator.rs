//! Health aggregation across backends.
//!
//! # Responsibilities
//! - Probe every backend's health path under the health timeout class
//! - Isolate probes: one failure never aborts or delays the others
//! - Reduce the results into one `HealthReport`
//!
//! # Design Decisions
//! - Probes run concurrently; total latency is the slowest single probe
//! - Computed fresh on every call; nothing is cached between requests
//! - Each probe outcome is logged and exported as a gauge

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use futures_util::future::join_all;
use serde::Serialize;

use crate::health::status::{BackendStatus, Verdict};
use crate::http::response::timestamp;
use crate::observability::metrics;
use crate::upstream::{Backend, BackendClient};

/// Result of probing one backend.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealth {
    pub status: BackendStatus,
    pub url: String,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Composite health of the gateway and its backends.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// The gateway itself answered, so it is always healthy.
    pub gateway: &'static str,
    pub services: BTreeMap<String, ServiceHealth>,
    pub overall: Verdict,
    pub timestamp: String,
}

impl HealthReport {
    pub fn from_services(services: BTreeMap<String, ServiceHealth>) -> Self {
        let overall = Verdict::from_statuses(services.values().map(|s| s.status));
        Self {
            gateway: "healthy",
            services,
            overall,
            timestamp: timestamp(),
        }
    }

    pub fn http_status(&self) -> StatusCode {
        self.overall.http_status()
    }

    pub fn status_of(&self, backend: &str) -> Option<BackendStatus> {
        self.services.get(backend).map(|s| s.status)
    }
}

/// Probe all `backends` concurrently and build the report.
pub async fn aggregate_health(client: &BackendClient, backends: &[Arc<Backend>]) -> HealthReport {
    let probes = backends.iter().map(|backend| probe_one(client, backend));
    let services = join_all(probes).await.into_iter().collect();

    let report = HealthReport::from_services(services);
    tracing::debug!(overall = ?report.overall, backends = backends.len(), "Health aggregated");
    report
}

async fn probe_one(client: &BackendClient, backend: &Backend) -> (String, ServiceHealth) {
    let start = Instant::now();
    let outcome = client.probe(backend).await;
    let response_time_ms = start.elapsed().as_millis() as u64;
    let status = BackendStatus::from_probe(&outcome);

    let (http_status, error) = match &outcome {
        Ok(response) if status.is_healthy() => (Some(response.status.as_u16()), None),
        Ok(response) => {
            tracing::warn!(
                backend = %backend.name,
                status = %response.status,
                "Health check failed: non-200 status"
            );
            (Some(response.status.as_u16()), None)
        }
        Err(e) => {
            tracing::warn!(
                backend = %backend.name,
                kind = e.kind(),
                error = %e,
                "Health check failed: transport error"
            );
            (None, Some(e.to_string()))
        }
    };

    metrics::record_backend_health(&backend.name, status.is_healthy());

    let health = ServiceHealth {
        status,
        url: backend.health_url(),
        response_time_ms,
        http_status,
        error,
    };
    (backend.name.clone(), health)
}
