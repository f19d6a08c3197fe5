//! Process-wide request counters.
//!
//! # Responsibilities
//! - Tally every forwarding attempt (total and per route group)
//! - Tally every forwarding failure
//! - Produce read-only snapshots for `/stats`
//!
//! # Design Decisions
//! - One structure, injected where needed; no module-level statics
//! - Each counter is an independent atomic; a request's increments are not
//!   one transaction
//! - Counters never decrease for the lifetime of the process

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;

/// Keys the snapshot uses for its fixed counters; route groups may not use them.
pub const RESERVED_KEYS: [&str; 2] = ["total", "errors"];

/// Shared request counters.
#[derive(Debug, Default)]
pub struct RequestCounters {
    total: AtomicU64,
    errors: AtomicU64,
    groups: DashMap<String, AtomicU64>,
}

impl RequestCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters with the given groups pre-registered at zero, so snapshots
    /// list every group even before its first request.
    pub fn with_groups<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let counters = Self::default();
        for group in groups {
            counters.groups.entry(group.into()).or_default();
        }
        counters
    }

    /// Count one forwarding attempt for `group`.
    pub fn record_attempt(&self, group: &str) {
        self.total.fetch_add(1, Ordering::Relaxed);
        match self.groups.get(group) {
            Some(counter) => {
                counter.fetch_add(1, Ordering::Relaxed);
            }
            None => {
                self.groups
                    .entry(group.to_string())
                    .or_default()
                    .fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Count one failed forwarding attempt.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Read-only copy of the current values.
    pub fn snapshot(&self) -> CountersSnapshot {
        // Errors are read first: every error is counted after its attempt,
        // so the snapshot never shows more errors than attempts.
        let errors = self.errors.load(Ordering::SeqCst);
        let total = self.total.load(Ordering::SeqCst);
        let groups = self
            .groups
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
            .collect();

        CountersSnapshot {
            total,
            groups,
            errors,
        }
    }
}

/// Point-in-time view of the counters.
///
/// Serializes flat, e.g. `{"total": 4, "orders": 1, "users": 3, "errors": 0}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountersSnapshot {
    pub total: u64,
    #[serde(flatten)]
    pub groups: BTreeMap<String, u64>,
    pub errors: u64,
}

impl CountersSnapshot {
    /// Count for one group (zero if never seen).
    pub fn group(&self, name: &str) -> u64 {
        self.groups.get(name).copied().unwrap_or(0)
    }

    /// Share of attempts that did not fail, as a percentage string.
    pub fn success_rate(&self) -> String {
        percentage(self.total.saturating_sub(self.errors), self.errors)
    }
}

/// Format `hits / (hits + misses)` as `"NN.NN%"`, or `"N/A"` when both are zero.
pub fn percentage(hits: u64, misses: u64) -> String {
    let total = hits + misses;
    if total == 0 {
        return "N/A".to_string();
    }
    format!("{:.2}%", hits as f64 / total as f64 * 100.0)
}
