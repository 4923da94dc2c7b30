//! Task: one unit of work dispatched to exactly one worker target.

use crate::{Target, TaskId, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default retry bound copied into each task from run configuration.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// A Task tracks one payload's dispatch lifecycle: attempts, status, and
/// the eventual result or failure reason.
///
/// Tasks are created when the supervisor decomposes a request and are
/// mutated only through the run's dispatch table (single-writer). They do
/// not outlive their run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier, used as the transport correlation key.
    pub id: TaskId,

    /// Where this task is delivered.
    pub target: Target,

    /// Opaque instruction text forwarded to the worker.
    pub payload: String,

    /// Dispatch attempts issued so far. Starts at 0, incremented on each
    /// (re-)dispatch.
    pub attempt: u32,

    /// Retry bound; the supervisor issues at most this many attempts.
    pub max_attempts: u32,

    /// Current lifecycle status.
    pub status: TaskStatus,

    /// Plain-text result once succeeded.
    pub result: Option<String>,

    /// Failure reason once terminal-failed (also holds the last retryable
    /// error while the task is re-queued).
    pub error: Option<String>,

    /// When the most recent attempt was published.
    pub dispatched_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a new pending Task.
    pub fn new(target: Target, payload: impl Into<String>) -> Self {
        Self {
            id: TaskId::generate(),
            target,
            payload: payload.into(),
            attempt: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            status: TaskStatus::Pending,
            result: None,
            error: None,
            dispatched_at: None,
        }
    }

    /// Builder method to set the retry bound.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Builder method to set a specific ID (useful for testing).
    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = id;
        self
    }

    /// Check if the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// True if another dispatch attempt is allowed.
    pub fn has_attempts_left(&self) -> bool {
        self.attempt < self.max_attempts
    }
}
