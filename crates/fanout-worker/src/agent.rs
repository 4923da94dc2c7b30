//! The worker receive/invoke/reply loop.

use std::sync::Arc;

use fanout_core::{WorkerId, WorkerReply};
use fanout_transport::TaskEnvelope;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::capability::Capability;

/// A stateless worker agent bound to one capability.
///
/// On a capability error the worker replies nothing; the supervisor's
/// per-task timeout turns the silence into a retry. A reply that cannot be
/// delivered (the run already finished and dropped its inbox) is logged and
/// discarded.
pub struct WorkerAgent {
    id: WorkerId,
    capability: Arc<dyn Capability>,
}

impl WorkerAgent {
    pub fn new(id: impl Into<WorkerId>, capability: Arc<dyn Capability>) -> Self {
        Self {
            id: id.into(),
            capability,
        }
    }

    pub fn id(&self) -> &WorkerId {
        &self.id
    }

    /// Run the receive loop until the mailbox closes.
    pub async fn run(self, mut mailbox: mpsc::Receiver<TaskEnvelope>) {
        info!(worker_id = %self.id, "worker started");

        while let Some(envelope) = mailbox.recv().await {
            debug!(worker_id = %self.id, task_id = %envelope.task_id, "task received");

            match self.capability.handle(&envelope.payload).await {
                Ok(body) => {
                    let reply = WorkerReply::new(envelope.task_id.clone(), self.id.clone(), body);
                    if envelope.reply_to.send(reply).await.is_err() {
                        debug!(
                            worker_id = %self.id,
                            task_id = %envelope.task_id,
                            "reply dropped - run already finished"
                        );
                    }
                }
                Err(e) => {
                    warn!(
                        worker_id = %self.id,
                        task_id = %envelope.task_id,
                        error = %e,
                        "capability failed, not replying"
                    );
                }
            }
        }

        info!(worker_id = %self.id, "worker stopped");
    }

    /// Spawn the receive loop onto the runtime.
    pub fn spawn(self, mailbox: mpsc::Receiver<TaskEnvelope>) -> JoinHandle<()> {
        tokio::spawn(self.run(mailbox))
    }
}
