//! Status enums for Tasks and Runs.

use serde::{Deserialize, Serialize};

/// Status of a Task in its dispatch lifecycle.
///
/// Legal transitions:
/// `Pending -> InFlight -> { Succeeded | Failed | TimedOut | Pending }`,
/// where `InFlight -> Pending` is the retry edge (re-queued with remaining
/// attempts). `Pending -> Failed` covers targets that fail authorization
/// before any dispatch. Terminal statuses permit no further transitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Task created (or re-queued for retry) but not currently dispatched.
    #[default]
    Pending,
    /// Task published to its target, awaiting a reply.
    InFlight,
    /// Task completed with a result.
    Succeeded,
    /// Task failed (delivery failure, authorization, or worker error).
    Failed,
    /// Task exhausted its attempts without a reply.
    TimedOut,
}

impl TaskStatus {
    /// Returns true if the status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::TimedOut)
    }

    /// Returns true if moving to `next` is a legal transition.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        match self {
            Self::Pending => matches!(next, Self::InFlight | Self::Failed),
            Self::InFlight => matches!(
                next,
                Self::Succeeded | Self::Failed | Self::TimedOut | Self::Pending
            ),
            // Terminal statuses reject everything.
            Self::Succeeded | Self::Failed | Self::TimedOut => false,
        }
    }
}

/// State of a Run as a whole.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    /// Tasks are being dispatched and collected.
    #[default]
    Active,
    /// All tasks terminal (or deadline hit); results are being merged.
    Aggregating,
    /// Run produced a response. Partial success counts as Complete.
    Complete,
    /// Every task in the run failed.
    Error,
}

impl RunState {
    /// Returns true if the run has produced its response.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// How the caller consumes the run's outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunMode {
    /// Caller blocks until the aggregated result is ready.
    #[default]
    Synchronous,
    /// Caller consumes per-task events followed by one terminal event.
    Streaming,
}
