//! Core domain errors.

use crate::TaskId;
use thiserror::Error;

/// Core domain errors for fanout.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Task not found in the dispatch table.
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    /// Invalid state transition.
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Request decomposition produced no tasks.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl CoreError {
    /// Build an InvalidTransition from two statuses.
    pub fn invalid_transition(from: impl std::fmt::Debug, to: impl std::fmt::Debug) -> Self {
        Self::InvalidTransition {
            from: format!("{:?}", from),
            to: format!("{:?}", to),
        }
    }
}
