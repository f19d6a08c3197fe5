//! Backend health classification.
//!
//! # States
//! - Healthy: the probe answered 200
//! - Unhealthy: the probe answered with any other status
//! - Unreachable: the probe failed at the transport level (timeout included)
//!
//! # Verdict
//! ```text
//! all constituents Healthy → Healthy (HTTP 200)
//! anything else            → Degraded (HTTP 503)
//! ```
//!
//! # Design Decisions
//! - The verdict is a pure function of the statuses; no history, no thresholds
//! - Exactly 200 counts as healthy; other 2xx codes do not

use axum::http::StatusCode;
use serde::Serialize;

use crate::error::TransportError;
use crate::http::response::ProxiedResponse;

/// Outcome of one health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendStatus {
    Healthy,
    Unhealthy,
    Unreachable,
}

impl BackendStatus {
    /// Classify the result of a probe.
    pub fn from_probe(result: &Result<ProxiedResponse, TransportError>) -> Self {
        match result {
            Ok(response) if response.status == StatusCode::OK => BackendStatus::Healthy,
            Ok(_) => BackendStatus::Unhealthy,
            Err(_) => BackendStatus::Unreachable,
        }
    }

    pub fn is_healthy(self) -> bool {
        self == BackendStatus::Healthy
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BackendStatus::Healthy => "healthy",
            BackendStatus::Unhealthy => "unhealthy",
            BackendStatus::Unreachable => "unreachable",
        }
    }
}

/// Composite verdict over a set of backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Healthy,
    Degraded,
}

impl Verdict {
    /// Healthy iff every status is healthy.
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = BackendStatus>,
    {
        if statuses.into_iter().all(BackendStatus::is_healthy) {
            Verdict::Healthy
        } else {
            Verdict::Degraded
        }
    }

    /// HTTP status the health endpoint answers with.
    pub fn http_status(self) -> StatusCode {
        match self {
            Verdict::Healthy => StatusCode::OK,
            Verdict::Degraded => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}
