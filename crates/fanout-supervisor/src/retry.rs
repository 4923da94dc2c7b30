//! Backoff policy between dispatch attempts.

use std::time::Duration;

/// Delay applied before re-dispatching a failed attempt.
///
/// The observed reference behavior is a fixed 1s delay with no exponential
/// growth; keeping the policy behind a trait leaves room to harden it
/// without touching the dispatch loop.
pub trait RetryPolicy: Send + Sync {
    /// Delay before the attempt following `attempt` (1-based, the attempt
    /// that just failed).
    fn delay(&self, attempt: u32) -> Duration;
}

/// Fixed delay between attempts.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl Default for FixedDelay {
    fn default() -> Self {
        Self(Duration::from_secs(1))
    }
}

impl RetryPolicy for FixedDelay {
    fn delay(&self, _attempt: u32) -> Duration {
        self.0
    }
}
