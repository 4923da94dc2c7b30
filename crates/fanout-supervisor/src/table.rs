//! The dispatch table: authoritative, single-writer record of a run's tasks.
//!
//! Owned exclusively by one run. Concurrent reply handlers serialize
//! through a mutex around the table; every status change goes through
//! `transition`, which enforces the task state machine and keeps terminal
//! tasks immutable.

use std::collections::HashMap;

use fanout_core::{CoreError, RunId, RunMode, RunState, Task, TaskId, TaskStatus, WorkerReply};
use tracing::debug;

/// Per-run task record. Insertion order is dispatch order and is preserved
/// for aggregation and streaming replay.
pub struct DispatchTable {
    run_id: RunId,
    state: RunState,
    mode: RunMode,
    tasks: HashMap<TaskId, Task>,
    order: Vec<TaskId>,
}

impl DispatchTable {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            state: RunState::Active,
            mode: RunMode::default(),
            tasks: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn set_state(&mut self, state: RunState) {
        self.state = state;
    }

    /// How the caller consumes this run's outcome. Recorded when the caller
    /// commits to awaiting or streaming; dispatch does not depend on it.
    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: RunMode) {
        self.mode = mode;
    }

    /// Insert a task. Re-inserting an id replaces the record but keeps its
    /// original dispatch position.
    pub fn put(&mut self, task: Task) {
        if !self.tasks.contains_key(&task.id) {
            self.order.push(task.id.clone());
        }
        self.tasks.insert(task.id.clone(), task);
    }

    pub fn get(&self, task_id: &TaskId) -> Option<&Task> {
        self.tasks.get(task_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Tasks in dispatch order.
    pub fn tasks_in_order(&self) -> impl Iterator<Item = &Task> {
        self.order.iter().filter_map(|id| self.tasks.get(id))
    }

    /// Move a task to `new_status`, rejecting illegal moves. Terminal tasks
    /// reject everything, which keeps `result`/`error` immutable once set.
    pub fn transition(&mut self, task_id: &TaskId, new_status: TaskStatus) -> Result<(), CoreError> {
        let task = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| CoreError::TaskNotFound(task_id.clone()))?;

        if !task.status.can_transition_to(new_status) {
            return Err(CoreError::invalid_transition(task.status, new_status));
        }

        debug!(
            run_id = %self.run_id,
            task_id = %task_id,
            from = ?task.status,
            to = ?new_status,
            "task transition"
        );
        task.status = new_status;
        Ok(())
    }

    /// Start a dispatch attempt: `Pending -> InFlight`, bump the attempt
    /// counter, stamp the dispatch time. Returns the attempt number issued.
    pub fn begin_attempt(&mut self, task_id: &TaskId) -> Result<u32, CoreError> {
        self.transition(task_id, TaskStatus::InFlight)?;
        let task = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| CoreError::TaskNotFound(task_id.clone()))?;
        task.attempt += 1;
        task.dispatched_at = Some(chrono::Utc::now());
        Ok(task.attempt)
    }

    /// Record a success.
    pub fn mark_succeeded(
        &mut self,
        task_id: &TaskId,
        result: impl Into<String>,
    ) -> Result<(), CoreError> {
        self.transition(task_id, TaskStatus::Succeeded)?;
        if let Some(task) = self.tasks.get_mut(task_id) {
            task.result = Some(result.into());
        }
        Ok(())
    }

    /// Record a terminal failure.
    pub fn mark_failed(
        &mut self,
        task_id: &TaskId,
        error: impl Into<String>,
    ) -> Result<(), CoreError> {
        self.transition(task_id, TaskStatus::Failed)?;
        if let Some(task) = self.tasks.get_mut(task_id) {
            task.error = Some(error.into());
        }
        Ok(())
    }

    /// Record attempt exhaustion without a reply.
    pub fn mark_timed_out(
        &mut self,
        task_id: &TaskId,
        error: impl Into<String>,
    ) -> Result<(), CoreError> {
        self.transition(task_id, TaskStatus::TimedOut)?;
        if let Some(task) = self.tasks.get_mut(task_id) {
            task.error = Some(error.into());
        }
        Ok(())
    }

    /// Re-queue a timed-out/failed attempt that has attempts left:
    /// `InFlight -> Pending`, keeping the last error for diagnostics.
    pub fn requeue_for_retry(
        &mut self,
        task_id: &TaskId,
        error: impl Into<String>,
    ) -> Result<(), CoreError> {
        self.transition(task_id, TaskStatus::Pending)?;
        if let Some(task) = self.tasks.get_mut(task_id) {
            task.error = Some(error.into());
        }
        Ok(())
    }

    /// Apply a worker reply at-most-once.
    ///
    /// Returns a snapshot of the now-succeeded task, or `None` when the
    /// reply references an unknown task or one that is already terminal
    /// (late or duplicate replies are discarded without mutation).
    pub fn apply_reply(&mut self, reply: &WorkerReply) -> Option<Task> {
        match self.tasks.get(&reply.task_id) {
            None => {
                debug!(run_id = %self.run_id, task_id = %reply.task_id, "reply for unknown task dropped");
                return None;
            }
            Some(task) if task.status != TaskStatus::InFlight => {
                debug!(
                    run_id = %self.run_id,
                    task_id = %reply.task_id,
                    status = ?task.status,
                    "reply for non-in-flight task dropped"
                );
                return None;
            }
            Some(_) => {}
        }

        // InFlight -> Succeeded cannot fail here.
        self.mark_succeeded(&reply.task_id, reply.body.clone()).ok()?;
        self.tasks.get(&reply.task_id).cloned()
    }

    /// True iff every task is in a terminal status.
    pub fn all_terminal(&self) -> bool {
        self.tasks.values().all(|t| t.is_terminal())
    }

    /// Tasks that were re-queued after a failed attempt and still have
    /// attempts left.
    pub fn pending_for_retry(&self) -> Vec<&Task> {
        self.tasks_in_order()
            .filter(|t| t.status == TaskStatus::Pending && t.attempt > 0 && t.has_attempts_left())
            .collect()
    }

    /// Succeeded tasks in dispatch order.
    pub fn succeeded(&self) -> Vec<&Task> {
        self.tasks_in_order()
            .filter(|t| t.status == TaskStatus::Succeeded)
            .collect()
    }

    /// Terminally failed tasks (failed or timed out) in dispatch order.
    pub fn failed(&self) -> Vec<&Task> {
        self.tasks_in_order()
            .filter(|t| matches!(t.status, TaskStatus::Failed | TaskStatus::TimedOut))
            .collect()
    }

    /// Tasks not yet terminal, in dispatch order.
    pub fn unfinished(&self) -> Vec<&Task> {
        self.tasks_in_order().filter(|t| !t.is_terminal()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fanout_core::{Target, WorkerId};

    fn table_with_task() -> (DispatchTable, TaskId) {
        let mut table = DispatchTable::new(RunId::generate());
        let task = Task::new(Target::unicast("colombia"), "inventory");
        let id = task.id.clone();
        table.put(task);
        (table, id)
    }

    #[test]
    fn test_begin_attempt_increments() {
        let (mut table, id) = table_with_task();
        assert_eq!(table.begin_attempt(&id).unwrap(), 1);
        table.requeue_for_retry(&id, "timeout").unwrap();
        assert_eq!(table.begin_attempt(&id).unwrap(), 2);
    }

    #[test]
    fn test_terminal_transition_is_idempotent() {
        let (mut table, id) = table_with_task();
        table.begin_attempt(&id).unwrap();
        table.mark_succeeded(&id, "5000 lbs").unwrap();

        // Any further transition is rejected and result is untouched.
        let err = table.transition(&id, TaskStatus::InFlight).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
        assert!(table.mark_failed(&id, "late failure").is_err());
        assert_eq!(table.get(&id).unwrap().result.as_deref(), Some("5000 lbs"));
        assert!(table.get(&id).unwrap().error.is_none());
    }

    #[test]
    fn test_apply_reply_at_most_once() {
        let (mut table, id) = table_with_task();
        table.begin_attempt(&id).unwrap();

        let reply = WorkerReply::new(id.clone(), WorkerId::new("colombia"), "5000 lbs");
        assert!(table.apply_reply(&reply).is_some());

        // Duplicate is dropped without mutating the recorded result.
        let dup = WorkerReply::new(id.clone(), WorkerId::new("colombia"), "9999 lbs");
        assert!(table.apply_reply(&dup).is_none());
        assert_eq!(table.get(&id).unwrap().result.as_deref(), Some("5000 lbs"));
    }

    #[test]
    fn test_apply_reply_unknown_task() {
        let (mut table, _id) = table_with_task();
        let reply = WorkerReply::new(TaskId::generate(), WorkerId::new("ghost"), "hi");
        assert!(table.apply_reply(&reply).is_none());
    }

    #[test]
    fn test_all_terminal_and_retry_queue() {
        let mut table = DispatchTable::new(RunId::generate());
        let t1 = Task::new(Target::broadcast("farms", "brazil"), "inventory");
        let t2 = Task::new(Target::broadcast("farms", "colombia"), "inventory");
        let (id1, id2) = (t1.id.clone(), t2.id.clone());
        table.put(t1);
        table.put(t2);
        assert!(!table.all_terminal());

        table.begin_attempt(&id1).unwrap();
        table.requeue_for_retry(&id1, "timeout").unwrap();
        assert_eq!(table.pending_for_retry().len(), 1);

        table.begin_attempt(&id1).unwrap();
        table.mark_timed_out(&id1, "no reply after 3 attempts").unwrap();
        table.begin_attempt(&id2).unwrap();
        table.mark_succeeded(&id2, "3000 lbs").unwrap();

        assert!(table.all_terminal());
        assert_eq!(table.succeeded().len(), 1);
        assert_eq!(table.failed().len(), 1);
        assert!(table.pending_for_retry().is_empty());
    }

    #[test]
    fn test_mode_recorded_on_consumption() {
        let (mut table, _id) = table_with_task();
        assert_eq!(table.mode(), RunMode::Synchronous);
        table.set_mode(RunMode::Streaming);
        assert_eq!(table.mode(), RunMode::Streaming);
    }

    #[test]
    fn test_dispatch_order_preserved() {
        let mut table = DispatchTable::new(RunId::generate());
        let ids: Vec<TaskId> = (0..3)
            .map(|i| {
                let task = Task::new(Target::unicast(format!("w{i}")), "go");
                let id = task.id.clone();
                table.put(task);
                id
            })
            .collect();

        let ordered: Vec<TaskId> = table.tasks_in_order().map(|t| t.id.clone()).collect();
        assert_eq!(ordered, ids);
    }
}
