//! Run events emitted while a run progresses.
//!
//! Streaming callers observe one `TaskCompleted`/`TaskFailed` event per
//! task in completion order, terminated by exactly one `RunCompleted` or
//! `RunFailed` event. Every event carries the `run_id` so downstream
//! observability can group by run without ambient state.

use crate::{RunId, TaskId, WorkerId};
use serde::{Deserialize, Serialize};

/// An event describing one run state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// A task reached `Succeeded`.
    TaskCompleted {
        run_id: RunId,
        task_id: TaskId,
        worker: WorkerId,
        result: String,
        /// Attempt number that produced the result (1-based).
        attempt: u32,
    },
    /// A task reached `Failed` or `TimedOut` with no attempts left.
    TaskFailed {
        run_id: RunId,
        task_id: TaskId,
        worker: WorkerId,
        error: String,
        /// Attempts issued before giving up.
        attempts: u32,
    },
    /// Terminal event: the run produced an aggregated response.
    RunCompleted {
        run_id: RunId,
        response: String,
        /// True when the run deadline forced aggregation before every task
        /// reached a terminal status.
        partial: bool,
    },
    /// Terminal event: the run as a whole failed (e.g. every task failed).
    RunFailed { run_id: RunId, error: String },
}

impl RunEvent {
    /// Create a TaskCompleted event.
    pub fn task_completed(
        run_id: RunId,
        task_id: TaskId,
        worker: WorkerId,
        result: impl Into<String>,
        attempt: u32,
    ) -> Self {
        Self::TaskCompleted {
            run_id,
            task_id,
            worker,
            result: result.into(),
            attempt,
        }
    }

    /// Create a TaskFailed event.
    pub fn task_failed(
        run_id: RunId,
        task_id: TaskId,
        worker: WorkerId,
        error: impl Into<String>,
        attempts: u32,
    ) -> Self {
        Self::TaskFailed {
            run_id,
            task_id,
            worker,
            error: error.into(),
            attempts,
        }
    }

    /// Create the terminal RunCompleted event.
    pub fn run_completed(run_id: RunId, response: impl Into<String>, partial: bool) -> Self {
        Self::RunCompleted {
            run_id,
            response: response.into(),
            partial,
        }
    }

    /// Create the terminal RunFailed event.
    pub fn run_failed(run_id: RunId, error: impl Into<String>) -> Self {
        Self::RunFailed {
            run_id,
            error: error.into(),
        }
    }

    /// The run this event belongs to.
    pub fn run_id(&self) -> &RunId {
        match self {
            Self::TaskCompleted { run_id, .. }
            | Self::TaskFailed { run_id, .. }
            | Self::RunCompleted { run_id, .. }
            | Self::RunFailed { run_id, .. } => run_id,
        }
    }

    /// Returns true for the terminal event of a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RunCompleted { .. } | Self::RunFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_completed_shape() {
        let run_id = RunId::generate();
        let task_id = TaskId::generate();
        let event = RunEvent::task_completed(
            run_id.clone(),
            task_id.clone(),
            WorkerId::new("colombia"),
            "5000 lbs",
            1,
        );

        assert_eq!(event.run_id(), &run_id);
        assert!(!event.is_terminal());

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "task_completed");
        assert_eq!(json["result"], "5000 lbs");
    }

    #[test]
    fn test_terminal_events() {
        let run_id = RunId::generate();
        assert!(RunEvent::run_completed(run_id.clone(), "done", false).is_terminal());
        assert!(RunEvent::run_failed(run_id, "all tasks failed").is_terminal());
    }
}
