//! Run-level errors surfaced to the caller.
//!
//! Task-level failures (timeouts, delivery failures) are absorbed and
//! retried inside the run; only the variants here propagate to the HTTP
//! boundary.

use fanout_core::CoreError;
use thiserror::Error;

/// Errors a run can surface to its caller.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Decomposition produced no tasks, or the request was empty.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Every task in the run reached a terminal failure state.
    #[error("All tasks failed: {0}")]
    AllTasksFailed(String),

    /// The run driver ended without producing a response.
    #[error("Run aborted before producing a response")]
    RunAborted,

    /// Domain-level error (invalid transition, unknown task).
    #[error(transparent)]
    Core(#[from] CoreError),
}
