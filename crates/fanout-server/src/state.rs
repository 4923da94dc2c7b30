//! Shared application state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use fanout_supervisor::Supervisor;

/// Shared application state: the supervisor plus run outcome counters for
/// the metrics endpoint.
pub struct AppState {
    /// The supervisor all prompt endpoints dispatch through.
    pub supervisor: Supervisor,

    /// Runs that completed with a full aggregation.
    pub runs_completed: AtomicU64,

    /// Runs that hit the deadline and returned a partial aggregation.
    pub runs_partial: AtomicU64,

    /// Runs where every task failed.
    pub runs_failed: AtomicU64,

    /// Requests rejected before dispatch (invalid request).
    pub runs_rejected: AtomicU64,
}

impl AppState {
    /// Create a new AppState wrapped in Arc.
    pub fn new(supervisor: Supervisor) -> Arc<Self> {
        Arc::new(Self {
            supervisor,
            runs_completed: AtomicU64::new(0),
            runs_partial: AtomicU64::new(0),
            runs_failed: AtomicU64::new(0),
            runs_rejected: AtomicU64::new(0),
        })
    }

    pub fn record_completed(&self, partial: bool) {
        if partial {
            self.runs_partial.fetch_add(1, Ordering::Relaxed);
        } else {
            self.runs_completed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_failed(&self) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.runs_rejected.fetch_add(1, Ordering::Relaxed);
    }
}
