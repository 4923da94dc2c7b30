//! In-memory channel binding.
//!
//! Workers attach a mailbox under their id; publishes resolve the target
//! worker and push the envelope into its mailbox. Used by the server binary
//! and by every test suite that exercises the dispatch loop.

use std::collections::HashMap;

use async_trait::async_trait;
use fanout_core::{Target, WorkerId};
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use crate::channel::{Channel, TaskEnvelope, TransportError};

/// Mailbox capacity per attached worker.
const MAILBOX_CAPACITY: usize = 32;

/// In-process channel backed by per-worker tokio mailboxes.
#[derive(Default)]
pub struct InMemoryChannel {
    mailboxes: RwLock<HashMap<WorkerId, mpsc::Sender<TaskEnvelope>>>,
}

impl InMemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a worker and return its mailbox receiver.
    ///
    /// Re-attaching under the same id replaces the previous mailbox, which
    /// drops the old sender and ends the old worker's receive loop.
    pub async fn attach_worker(&self, worker_id: WorkerId) -> mpsc::Receiver<TaskEnvelope> {
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        self.mailboxes.write().await.insert(worker_id.clone(), tx);
        debug!(worker_id = %worker_id, "worker attached");
        rx
    }

    /// Detach a worker; subsequent publishes to it fail with UnknownTarget.
    pub async fn detach_worker(&self, worker_id: &WorkerId) {
        self.mailboxes.write().await.remove(worker_id);
        debug!(worker_id = %worker_id, "worker detached");
    }

    /// Number of attached workers.
    pub async fn worker_count(&self) -> usize {
        self.mailboxes.read().await.len()
    }
}

#[async_trait]
impl Channel for InMemoryChannel {
    async fn publish(
        &self,
        target: &Target,
        envelope: TaskEnvelope,
    ) -> Result<(), TransportError> {
        let worker_id = target.worker();

        let tx = {
            let mailboxes = self.mailboxes.read().await;
            mailboxes
                .get(worker_id)
                .cloned()
                .ok_or_else(|| TransportError::UnknownTarget(worker_id.clone()))?
        };

        debug!(task_id = %envelope.task_id, target = %target, "publishing task");

        tx.send(envelope)
            .await
            .map_err(|_| TransportError::DeliveryFailed(worker_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fanout_core::{TaskId, WorkerReply};

    #[tokio::test]
    async fn test_publish_round_trip() {
        let channel = InMemoryChannel::new();
        let worker = WorkerId::new("colombia");
        let mut mailbox = channel.attach_worker(worker.clone()).await;

        let (reply_tx, mut reply_rx) = mpsc::channel(4);
        let task_id = TaskId::generate();
        channel
            .publish(
                &Target::unicast("colombia"),
                TaskEnvelope::new(task_id.clone(), "inventory", reply_tx),
            )
            .await
            .unwrap();

        let envelope = mailbox.recv().await.unwrap();
        assert_eq!(envelope.task_id, task_id);
        assert_eq!(envelope.payload, "inventory");

        envelope
            .reply_to
            .send(WorkerReply::new(envelope.task_id, worker, "5000 lbs"))
            .await
            .unwrap();

        let reply = reply_rx.recv().await.unwrap();
        assert_eq!(reply.task_id, task_id);
        assert_eq!(reply.body, "5000 lbs");
    }

    #[tokio::test]
    async fn test_publish_unknown_target() {
        let channel = InMemoryChannel::new();
        let (reply_tx, _reply_rx) = mpsc::channel(1);

        let err = channel
            .publish(
                &Target::unicast("nowhere"),
                TaskEnvelope::new(TaskId::generate(), "ping", reply_tx),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::UnknownTarget(_)));
    }

    #[tokio::test]
    async fn test_detach_worker() {
        let channel = InMemoryChannel::new();
        let worker = WorkerId::new("brazil");
        let _mailbox = channel.attach_worker(worker.clone()).await;
        assert_eq!(channel.worker_count().await, 1);

        channel.detach_worker(&worker).await;
        assert_eq!(channel.worker_count().await, 0);
    }
}
