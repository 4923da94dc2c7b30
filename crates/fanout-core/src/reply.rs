//! Worker replies flowing back over the transport.

use crate::{TaskId, WorkerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A plain-text reply from a worker, correlated to exactly one Task.
///
/// Replies for unknown or already-terminal tasks are discarded by the
/// dispatch table (at-most-once application).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerReply {
    /// Correlation key back to the dispatched task.
    pub task_id: TaskId,

    /// Worker that produced the reply.
    pub sender: WorkerId,

    /// Reply body. By convention inventory replies look like
    /// `"<value> <unit>"` and action replies carry an `order_id: <id>`
    /// line, but any text is accepted.
    pub body: String,

    /// When the supervisor side received the reply.
    pub received_at: DateTime<Utc>,
}

impl WorkerReply {
    /// Create a reply stamped with the current time.
    pub fn new(task_id: TaskId, sender: WorkerId, body: impl Into<String>) -> Self {
        Self {
            task_id,
            sender,
            body: body.into(),
            received_at: Utc::now(),
        }
    }
}
