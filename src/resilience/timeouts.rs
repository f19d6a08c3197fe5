//! Timeout enforcement.
//!
//! # Responsibilities
//! - Define the two timeout classes backend calls run under
//! - Wrap backend calls with a deadline
//! - Cancel operations cleanly on timeout
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; dropping the future cancels the call
//! - Timeout errors are distinct from other errors
//! - Timed-out forwarded requests return 504 Gateway Timeout

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time;

/// Which deadline a backend call runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeoutClass {
    /// Forwarded data requests (default 10s).
    Data,
    /// Health probes (default 3s).
    Health,
}

impl fmt::Display for TimeoutClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutClass::Data => write!(f, "data"),
            TimeoutClass::Health => write!(f, "health"),
        }
    }
}

/// The deadline elapsed before the wrapped future completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedOut(pub Duration);

impl fmt::Display for TimedOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timed out after {:?}", self.0)
    }
}

impl std::error::Error for TimedOut {}

/// Run `future` with a deadline of `limit`.
pub async fn bounded<F, T>(limit: Duration, future: F) -> Result<T, TimedOut>
where
    F: Future<Output = T>,
{
    time::timeout(limit, future).await.map_err(|_| TimedOut(limit))
}
