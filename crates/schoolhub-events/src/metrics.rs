//! Event bus dispatch counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Bus-level counters.
#[derive(Debug, Default)]
pub struct BusMetrics {
    /// Events accepted by `publish*`
    pub published: AtomicU64,
    /// Handler invocations scheduled
    pub dispatched: AtomicU64,
    /// Handler invocations that returned `Ok`
    pub succeeded: AtomicU64,
    /// Handler invocations that returned `Err`
    pub failed: AtomicU64,
    /// Handler invocations cut off by the timeout
    pub timed_out: AtomicU64,
    /// Handler invocations that panicked
    pub panicked: AtomicU64,
    /// Events published with no handler registered
    pub unrouted: AtomicU64,
}

impl BusMetrics {
    /// Create zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Get a snapshot of all counters
    pub fn snapshot(&self) -> BusStats {
        BusStats {
            published: self.published.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
            unrouted: self.unrouted.load(Ordering::Relaxed),
        }
    }
}

/// Serializable counters snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusStats {
    /// Events accepted
    pub published: u64,
    /// Handler invocations scheduled
    pub dispatched: u64,
    /// Successful invocations
    pub succeeded: u64,
    /// Invocations that returned an error
    pub failed: u64,
    /// Invocations that timed out
    pub timed_out: u64,
    /// Invocations that panicked
    pub panicked: u64,
    /// Events with no handlers
    pub unrouted: u64,
}

impl BusStats {
    /// Invocations that have finished, in any outcome.
    pub fn completed(&self) -> u64 {
        self.succeeded + self.failed + self.timed_out + self.panicked
    }
}
