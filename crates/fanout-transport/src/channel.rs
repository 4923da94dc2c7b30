//! The publish/subscribe channel contract.

use async_trait::async_trait;
use fanout_core::{Target, TaskId, WorkerId, WorkerReply};
use thiserror::Error;
use tokio::sync::mpsc;

/// Transport-level errors.
///
/// A publish failure is retried by the supervisor exactly like a task
/// timeout; it never propagates past the run.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No worker is attached under the target id.
    #[error("Unknown target: {0}")]
    UnknownTarget(WorkerId),

    /// The worker's mailbox is closed or full.
    #[error("Delivery failed to worker: {0}")]
    DeliveryFailed(WorkerId),
}

/// One dispatched task on the wire.
///
/// `task_id` is the request/reply correlation key; `reply_to` is the run's
/// reply inbox. The transport does not interpret the payload.
#[derive(Debug, Clone)]
pub struct TaskEnvelope {
    pub task_id: TaskId,
    pub payload: String,
    pub reply_to: mpsc::Sender<WorkerReply>,
}

impl TaskEnvelope {
    pub fn new(
        task_id: TaskId,
        payload: impl Into<String>,
        reply_to: mpsc::Sender<WorkerReply>,
    ) -> Self {
        Self {
            task_id,
            payload: payload.into(),
            reply_to,
        }
    }
}

/// Abstract publish primitive over a shared, externally-owned message
/// fabric. The supervisor only publishes; it must not assume exclusive
/// ownership of the channel.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Deliver one envelope to the worker the target resolves to.
    ///
    /// For `Target::Broadcast` the envelope is addressed to a single
    /// recipient of the group; fan-out across recipients is driven by the
    /// supervisor so that per-task retry and rate limiting stay uniform.
    async fn publish(&self, target: &Target, envelope: TaskEnvelope)
        -> Result<(), TransportError>;
}
