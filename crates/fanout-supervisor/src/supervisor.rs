//! The supervisor state machine.
//!
//! One `submit` turns a caller request into a run: a dispatch table, one
//! driver future per task, and an event stream. The run's internals advance
//! the same way whether the caller blocks on `await_result` or consumes the
//! event stream; the caller's choice only affects how the outcome is read.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use fanout_core::{RunEvent, RunId, RunMode, RunState, Target, Task, TaskId, WorkerReply};
use fanout_transport::{Channel, TaskEnvelope};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout, timeout_at, Instant};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{error, info, warn};

use crate::aggregate::{self, AggregatedResult, LineMerger, Merger};
use crate::authz::{AllowAll, Authorizer};
use crate::decompose::{Decomposer, PromptRequest};
use crate::error::SupervisorError;
use crate::retry::{FixedDelay, RetryPolicy};
use crate::table::DispatchTable;

/// Run-level configuration, copied into each run at submit time.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Dispatch attempts per task before it goes terminal-failed.
    pub max_attempts: u32,
    /// Per-task reply deadline, uniform across a run.
    pub task_timeout: Duration,
    /// Fixed inter-task delay when fanning out a multi-task run, to avoid
    /// overwhelming workers behind a shared rate-limited resource.
    pub dispatch_stagger: Duration,
    /// Run deadline for `await_result`; on expiry the caller gets a partial
    /// aggregation instead of blocking indefinitely.
    pub run_deadline: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            task_timeout: Duration::from_secs(15),
            dispatch_stagger: Duration::from_secs(1),
            run_deadline: Duration::from_secs(60),
        }
    }
}

/// Handle to one submitted run.
///
/// The event stream is finite, non-restartable, and consumed exactly once:
/// per-task events in completion order, then exactly one terminal event.
pub struct RunHandle {
    run_id: RunId,
    table: Arc<Mutex<DispatchTable>>,
    events: mpsc::UnboundedReceiver<RunEvent>,
    done: oneshot::Receiver<Result<AggregatedResult, SupervisorError>>,
}

impl RunHandle {
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Consume the handle as an event stream (streaming mode).
    pub async fn into_stream(self) -> UnboundedReceiverStream<RunEvent> {
        let (events, _outcome) = self.split().await;
        events
    }

    /// Consume the handle as an event stream plus the run's terminal
    /// outcome. The outcome future resolves when the driver finishes, even
    /// if the event stream is dropped before its terminal event.
    pub async fn split(
        self,
    ) -> (
        UnboundedReceiverStream<RunEvent>,
        impl Future<Output = Option<Result<AggregatedResult, SupervisorError>>>,
    ) {
        self.table.lock().await.set_mode(RunMode::Streaming);
        let done = self.done;
        (UnboundedReceiverStream::new(self.events), async move {
            done.await.ok()
        })
    }
}

/// Orchestrates runs over a shared transport channel.
pub struct Supervisor {
    channel: Arc<dyn Channel>,
    decomposer: Arc<dyn Decomposer>,
    authorizer: Arc<dyn Authorizer>,
    retry: Arc<dyn RetryPolicy>,
    merger: Arc<dyn Merger>,
    config: RunConfig,
}

impl Supervisor {
    pub fn new(channel: Arc<dyn Channel>, decomposer: Arc<dyn Decomposer>) -> Self {
        Self {
            channel,
            decomposer,
            authorizer: Arc::new(AllowAll),
            retry: Arc::new(FixedDelay::default()),
            merger: Arc::new(LineMerger),
            config: RunConfig::default(),
        }
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn with_retry_policy(mut self, retry: Arc<dyn RetryPolicy>) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_merger(mut self, merger: Arc<dyn Merger>) -> Self {
        self.merger = merger;
        self
    }

    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate and decompose a request, create its run, and start driving
    /// it. Fails with `InvalidRequest` before any dispatch when the request
    /// is empty or implies no targets.
    pub async fn submit(&self, request: PromptRequest) -> Result<RunHandle, SupervisorError> {
        if request.is_empty() {
            return Err(SupervisorError::InvalidRequest(
                "empty prompt and no urls".to_string(),
            ));
        }

        let specs = self.decomposer.decompose(&request);
        if specs.is_empty() {
            return Err(SupervisorError::InvalidRequest(
                "request implies no dispatch targets".to_string(),
            ));
        }

        let run_id = request
            .session_id
            .as_deref()
            .map(RunId::new)
            .unwrap_or_else(RunId::generate);

        let mut table = DispatchTable::new(run_id.clone());
        for spec in specs {
            table.put(
                Task::new(spec.target, spec.payload).with_max_attempts(self.config.max_attempts),
            );
        }

        info!(run_id = %run_id, tasks = table.len(), "run submitted");

        let table = Arc::new(Mutex::new(table));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = oneshot::channel();

        tokio::spawn(drive_run(
            run_id.clone(),
            Arc::clone(&table),
            Arc::clone(&self.channel),
            Arc::clone(&self.authorizer),
            Arc::clone(&self.retry),
            Arc::clone(&self.merger),
            self.config.clone(),
            events_tx,
            done_tx,
        ));

        Ok(RunHandle {
            run_id,
            table,
            events: events_rx,
            done: done_rx,
        })
    }

    /// Block until the run completes or the run deadline elapses
    /// (synchronous mode). On deadline, in-flight sends are not cancelled;
    /// whatever is terminal at that moment is aggregated and the result is
    /// marked partial. Late replies are dropped by the table's terminal
    /// guard.
    pub async fn await_result(
        &self,
        handle: RunHandle,
    ) -> Result<AggregatedResult, SupervisorError> {
        handle.table.lock().await.set_mode(RunMode::Synchronous);
        match timeout(self.config.run_deadline, handle.done).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(SupervisorError::RunAborted),
            Err(_) => {
                warn!(run_id = %handle.run_id, "run deadline exceeded, forcing partial aggregation");
                let table = handle.table.lock().await;
                aggregate::build_response(&table, self.merger.as_ref(), true).await
            }
        }
    }

    /// Convenience: submit and await in one call.
    pub async fn run(&self, request: PromptRequest) -> Result<AggregatedResult, SupervisorError> {
        let handle = self.submit(request).await?;
        self.await_result(handle).await
    }
}

#[allow(clippy::too_many_arguments)]
async fn drive_run(
    run_id: RunId,
    table: Arc<Mutex<DispatchTable>>,
    channel: Arc<dyn Channel>,
    authorizer: Arc<dyn Authorizer>,
    retry: Arc<dyn RetryPolicy>,
    merger: Arc<dyn Merger>,
    config: RunConfig,
    events_tx: mpsc::UnboundedSender<RunEvent>,
    done_tx: oneshot::Sender<Result<AggregatedResult, SupervisorError>>,
) {
    let specs: Vec<(TaskId, Target, String)> = {
        let t = table.lock().await;
        t.tasks_in_order()
            .map(|task| (task.id.clone(), task.target.clone(), task.payload.clone()))
            .collect()
    };

    let multi = specs.len() > 1;
    let mut drivers = JoinSet::new();
    for (idx, (task_id, target, payload)) in specs.into_iter().enumerate() {
        let initial_delay = if multi {
            config.dispatch_stagger * idx as u32
        } else {
            Duration::ZERO
        };
        drivers.spawn(drive_task(
            run_id.clone(),
            task_id,
            target,
            payload,
            Arc::clone(&table),
            Arc::clone(&channel),
            Arc::clone(&authorizer),
            Arc::clone(&retry),
            config.task_timeout,
            initial_delay,
            events_tx.clone(),
        ));
    }

    while drivers.join_next().await.is_some() {}

    let outcome = {
        let mut t = table.lock().await;
        t.set_state(RunState::Aggregating);
        aggregate::build_response(&t, merger.as_ref(), false).await
    };

    {
        let mut t = table.lock().await;
        match &outcome {
            Ok(result) => {
                t.set_state(RunState::Complete);
                info!(run_id = %run_id, failures = result.failures.len(), "run complete");
                let _ = events_tx.send(RunEvent::run_completed(
                    run_id.clone(),
                    result.response.clone(),
                    result.partial,
                ));
            }
            Err(e) => {
                t.set_state(RunState::Error);
                warn!(run_id = %run_id, error = %e, "run failed");
                let _ = events_tx.send(RunEvent::run_failed(run_id.clone(), e.to_string()));
            }
        }
    }

    let _ = done_tx.send(outcome);
}

/// Drive one task to a terminal status: dispatch, await the reply under the
/// per-task timeout, and retry with backoff while attempts remain.
#[allow(clippy::too_many_arguments)]
async fn drive_task(
    run_id: RunId,
    task_id: TaskId,
    target: Target,
    payload: String,
    table: Arc<Mutex<DispatchTable>>,
    channel: Arc<dyn Channel>,
    authorizer: Arc<dyn Authorizer>,
    retry: Arc<dyn RetryPolicy>,
    task_timeout: Duration,
    initial_delay: Duration,
    events_tx: mpsc::UnboundedSender<RunEvent>,
) {
    if !initial_delay.is_zero() {
        sleep(initial_delay).await;
    }

    let worker = target.worker().clone();

    // Authorization is checked once, before the first dispatch. Retrying
    // cannot change an authorization decision.
    if let Err(reason) = authorizer.authorize(&worker).await {
        let error_text = format!("unauthorized: {reason}");
        let mut t = table.lock().await;
        if t.mark_failed(&task_id, error_text.as_str()).is_ok() {
            warn!(run_id = %run_id, task_id = %task_id, worker = %worker, "target unauthorized");
            let _ = events_tx.send(RunEvent::task_failed(
                run_id, task_id, worker, error_text, 0,
            ));
        }
        return;
    }

    // One reply inbox for all attempts of this task; the envelope carries
    // its sender as the request/reply correlation path.
    let (reply_tx, mut reply_rx) = mpsc::channel::<WorkerReply>(4);

    loop {
        let attempt = match table.lock().await.begin_attempt(&task_id) {
            Ok(n) => n,
            Err(e) => {
                error!(run_id = %run_id, task_id = %task_id, error = %e, "dispatch bookkeeping failed");
                return;
            }
        };

        info!(
            run_id = %run_id,
            task_id = %task_id,
            target = %target,
            attempt,
            "dispatching task"
        );

        let envelope = TaskEnvelope::new(task_id.clone(), payload.clone(), reply_tx.clone());
        let (error_text, timed_out) = match channel.publish(&target, envelope).await {
            Ok(()) => {
                match collect_reply(&mut reply_rx, task_timeout, &table).await {
                    Some(task) => {
                        info!(run_id = %run_id, task_id = %task_id, attempt = task.attempt, "task succeeded");
                        let _ = events_tx.send(RunEvent::task_completed(
                            run_id,
                            task_id,
                            worker,
                            task.result.unwrap_or_default(),
                            task.attempt,
                        ));
                        return;
                    }
                    None => (
                        format!("no reply within {}ms", task_timeout.as_millis()),
                        true,
                    ),
                }
            }
            Err(e) => (format!("delivery failed: {e}"), false),
        };

        let mut t = table.lock().await;
        let attempts_left = t
            .get(&task_id)
            .map(|task| task.has_attempts_left())
            .unwrap_or(false);

        if attempts_left {
            warn!(
                run_id = %run_id,
                task_id = %task_id,
                attempt,
                error = %error_text,
                "attempt failed, will retry"
            );
            if t.requeue_for_retry(&task_id, error_text.as_str()).is_err() {
                return;
            }
            drop(t);
            sleep(retry.delay(attempt)).await;
            continue;
        }

        let marked = if timed_out {
            t.mark_timed_out(&task_id, error_text.as_str())
        } else {
            t.mark_failed(&task_id, error_text.as_str())
        };
        drop(t);

        if marked.is_ok() {
            warn!(
                run_id = %run_id,
                task_id = %task_id,
                attempts = attempt,
                error = %error_text,
                "task failed terminally"
            );
            let _ = events_tx.send(RunEvent::task_failed(
                run_id, task_id, worker, error_text, attempt,
            ));
        }
        return;
    }
}

/// Wait for a reply that actually applies, dropping stale or duplicate
/// replies, until the per-attempt deadline.
async fn collect_reply(
    reply_rx: &mut mpsc::Receiver<WorkerReply>,
    task_timeout: Duration,
    table: &Arc<Mutex<DispatchTable>>,
) -> Option<Task> {
    let deadline = Instant::now() + task_timeout;
    loop {
        match timeout_at(deadline, reply_rx.recv()).await {
            Ok(Some(reply)) => {
                let mut t = table.lock().await;
                if let Some(task) = t.apply_reply(&reply) {
                    return Some(task);
                }
                // Stale reply from an earlier attempt; keep waiting.
            }
            Ok(None) | Err(_) => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::DenyList;
    use crate::decompose::{RuleDecomposer, WorkerDirectory};
    use async_trait::async_trait;
    use fanout_core::WorkerId;
    use fanout_transport::InMemoryChannel;
    use fanout_worker::{Capability, CapabilityError, FarmInventory, OrderDesk, WorkerAgent};
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio_stream::StreamExt;

    fn fast_config() -> RunConfig {
        RunConfig {
            max_attempts: 3,
            task_timeout: Duration::from_millis(200),
            dispatch_stagger: Duration::ZERO,
            run_deadline: Duration::from_secs(5),
        }
    }

    fn farm_directory() -> WorkerDirectory {
        WorkerDirectory::new()
            .register("brazil", "farm", ["brazil"])
            .register("colombia", "farm", ["colombia"])
            .register("vietnam", "farm", ["vietnam"])
            .register("order-desk", "desk", ["order"])
    }

    async fn spawn_farms(channel: &Arc<InMemoryChannel>) {
        for (region, yield_lbs) in [("brazil", 800u32), ("colombia", 5000), ("vietnam", 3000)] {
            let mailbox = channel.attach_worker(WorkerId::new(region)).await;
            WorkerAgent::new(region, Arc::new(FarmInventory::new(region, yield_lbs)))
                .spawn(mailbox);
        }
    }

    fn supervisor(channel: Arc<InMemoryChannel>) -> Supervisor {
        Supervisor::new(
            channel,
            Arc::new(RuleDecomposer::new(farm_directory(), "farm")),
        )
        .with_config(fast_config())
        .with_retry_policy(Arc::new(FixedDelay(Duration::from_millis(20))))
    }

    /// Replies only from the given attempt onward; earlier deliveries are
    /// ignored so the dispatch times out and retries.
    struct SucceedsOnAttempt {
        calls: AtomicU32,
        succeed_from: u32,
        reply: String,
    }

    impl SucceedsOnAttempt {
        fn new(succeed_from: u32, reply: impl Into<String>) -> Self {
            Self {
                calls: AtomicU32::new(0),
                succeed_from,
                reply: reply.into(),
            }
        }
    }

    #[async_trait]
    impl Capability for SucceedsOnAttempt {
        async fn handle(&self, _payload: &str) -> Result<String, CapabilityError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call < self.succeed_from {
                Err(CapabilityError::Unavailable("warming up".to_string()))
            } else {
                Ok(self.reply.clone())
            }
        }
    }

    /// Never replies; tasks dispatched here time out every attempt.
    struct Silent;

    #[async_trait]
    impl Capability for Silent {
        async fn handle(&self, _payload: &str) -> Result<String, CapabilityError> {
            Err(CapabilityError::Unavailable("offline".to_string()))
        }
    }

    /// Replies after a fixed delay; used to script completion order.
    struct DelayedEcho(Duration);

    #[async_trait]
    impl Capability for DelayedEcho {
        async fn handle(&self, payload: &str) -> Result<String, CapabilityError> {
            sleep(self.0).await;
            Ok(format!("done: {payload}"))
        }
    }

    #[tokio::test]
    async fn test_unicast_success() {
        let channel = Arc::new(InMemoryChannel::new());
        spawn_farms(&channel).await;
        let supervisor = supervisor(channel);

        let result = supervisor
            .run(PromptRequest::new("How much coffee does the Colombia farm have?"))
            .await
            .unwrap();

        assert_eq!(result.response, "5000 lbs");
        assert_eq!(result.state, RunState::Complete);
        assert!(!result.partial);
        assert!(result.failures.is_empty());
    }

    #[tokio::test]
    async fn test_empty_request_rejected() {
        let channel = Arc::new(InMemoryChannel::new());
        let supervisor = supervisor(channel);

        let err = supervisor.run(PromptRequest::new("   ")).await.unwrap_err();
        assert!(matches!(err, SupervisorError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_retry_then_success_records_attempt() {
        let channel = Arc::new(InMemoryChannel::new());
        let mailbox = channel.attach_worker(WorkerId::new("order-desk")).await;
        WorkerAgent::new(
            "order-desk",
            Arc::new(SucceedsOnAttempt::new(2, "Order accepted.\norder_id: 54321")),
        )
        .spawn(mailbox);
        let supervisor = supervisor(channel);

        let handle = supervisor
            .submit(PromptRequest::new("create order with price 4.25 and quantity 100"))
            .await
            .unwrap();
        let events: Vec<RunEvent> = handle.into_stream().await.collect().await;

        assert_eq!(events.len(), 2);
        match &events[0] {
            RunEvent::TaskCompleted { result, attempt, .. } => {
                assert_eq!(*attempt, 2);
                assert!(result.contains("order_id: 54321"));
            }
            other => panic!("expected TaskCompleted, got {other:?}"),
        }
        assert!(events[1].is_terminal());
    }

    #[tokio::test]
    async fn test_retry_bound_is_respected() {
        let channel = Arc::new(InMemoryChannel::new());
        let mailbox = channel.attach_worker(WorkerId::new("colombia")).await;
        let capability = Arc::new(SucceedsOnAttempt::new(10, "never"));
        WorkerAgent::new("colombia", capability.clone()).spawn(mailbox);
        let supervisor = supervisor(channel);

        let err = supervisor
            .run(PromptRequest::new("ask colombia"))
            .await
            .unwrap_err();

        assert!(matches!(err, SupervisorError::AllTasksFailed(_)));
        // Exactly max_attempts deliveries, no more.
        assert_eq!(capability.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_broadcast_partial_failure_completes() {
        let channel = Arc::new(InMemoryChannel::new());
        spawn_farms(&channel).await;
        let supervisor = supervisor(Arc::clone(&channel))
            .with_authorizer(Arc::new(DenyList::new([WorkerId::new("brazil")])));

        let result = supervisor
            .run(PromptRequest::new("Show total inventory across all farms"))
            .await
            .unwrap();

        assert_eq!(result.state, RunState::Complete);
        assert!(result.response.contains("colombia : 5000 lbs"));
        assert!(result.response.contains("vietnam : 3000 lbs"));
        assert!(result.response.contains("brazil : unavailable (unauthorized"));
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].worker, WorkerId::new("brazil"));
    }

    #[tokio::test]
    async fn test_unauthorized_target_fails_without_dispatch() {
        let channel = Arc::new(InMemoryChannel::new());
        let mailbox = channel.attach_worker(WorkerId::new("brazil")).await;
        let capability = Arc::new(SucceedsOnAttempt::new(1, "800 lbs"));
        WorkerAgent::new("brazil", capability.clone()).spawn(mailbox);
        let supervisor = supervisor(Arc::clone(&channel))
            .with_authorizer(Arc::new(DenyList::new([WorkerId::new("brazil")])));

        let err = supervisor
            .run(PromptRequest::new("ask brazil"))
            .await
            .unwrap_err();

        assert!(matches!(err, SupervisorError::AllTasksFailed(_)));
        // Not retried, not even dispatched.
        assert_eq!(capability.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_tasks_failed_distinct_from_empty() {
        // No workers attached: every publish fails, every attempt is spent.
        let channel = Arc::new(InMemoryChannel::new());
        let supervisor = supervisor(channel);

        let err = supervisor
            .run(PromptRequest::new("Show total inventory across all farms"))
            .await
            .unwrap_err();

        assert!(matches!(err, SupervisorError::AllTasksFailed(_)));
    }

    #[tokio::test]
    async fn test_streaming_events_in_completion_order() {
        let channel = Arc::new(InMemoryChannel::new());
        for (region, delay_ms) in [("brazil", 250u64), ("colombia", 150), ("vietnam", 50)] {
            let mailbox = channel.attach_worker(WorkerId::new(region)).await;
            WorkerAgent::new(region, Arc::new(DelayedEcho(Duration::from_millis(delay_ms))))
                .spawn(mailbox);
        }
        let mut config = fast_config();
        config.task_timeout = Duration::from_secs(2);
        let supervisor = Supervisor::new(
            channel,
            Arc::new(RuleDecomposer::new(farm_directory(), "farm")),
        )
        .with_config(config);

        let handle = supervisor
            .submit(PromptRequest::new("Show total inventory across all farms"))
            .await
            .unwrap();
        let events: Vec<RunEvent> = handle.into_stream().await.collect().await;

        // tasks + 1 terminal event, completions ordered by reply arrival.
        assert_eq!(events.len(), 4);
        let completed: Vec<&str> = events[..3]
            .iter()
            .map(|e| match e {
                RunEvent::TaskCompleted { worker, .. } => worker.as_str(),
                other => panic!("expected TaskCompleted, got {other:?}"),
            })
            .collect();
        assert_eq!(completed, vec!["vietnam", "colombia", "brazil"]);
        assert!(events[3].is_terminal());
        assert_eq!(
            events.iter().filter(|e| e.is_terminal()).count(),
            1,
        );
    }

    #[tokio::test]
    async fn test_stream_all_failed_ends_with_run_failed() {
        // No workers attached: every dispatch fails, and the stream must
        // still terminate with exactly one RunFailed event instead of
        // closing abruptly.
        let channel = Arc::new(InMemoryChannel::new());
        let supervisor = supervisor(channel);

        let handle = supervisor
            .submit(PromptRequest::new("Show total inventory across all farms"))
            .await
            .unwrap();
        let events: Vec<RunEvent> = handle.into_stream().await.collect().await;

        assert_eq!(events.len(), 4);
        assert!(events[..3]
            .iter()
            .all(|e| matches!(e, RunEvent::TaskFailed { .. })));
        match &events[3] {
            RunEvent::RunFailed { error, .. } => assert!(error.contains("All tasks failed")),
            other => panic!("expected RunFailed, got {other:?}"),
        }
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    }

    #[tokio::test]
    async fn test_into_stream_records_streaming_mode() {
        let channel = Arc::new(InMemoryChannel::new());
        spawn_farms(&channel).await;
        let supervisor = supervisor(channel);

        let handle = supervisor
            .submit(PromptRequest::new("ask colombia"))
            .await
            .unwrap();
        let table = Arc::clone(&handle.table);
        let stream = handle.into_stream().await;

        // Mode is stamped before the stream is handed out.
        assert_eq!(table.lock().await.mode(), RunMode::Streaming);

        let _events: Vec<RunEvent> = stream.collect().await;
    }

    #[tokio::test]
    async fn test_split_outcome_resolves_without_stream_consumption() {
        let channel = Arc::new(InMemoryChannel::new());
        spawn_farms(&channel).await;
        let supervisor = supervisor(channel);

        let handle = supervisor
            .submit(PromptRequest::new("Show total inventory across all farms"))
            .await
            .unwrap();
        let (stream, outcome) = handle.split().await;
        drop(stream);

        let result = outcome.await.unwrap().unwrap();
        assert_eq!(result.state, RunState::Complete);
        assert!(result.response.contains("total : 8800 lbs"));
    }

    #[tokio::test]
    async fn test_run_deadline_returns_partial() {
        let channel = Arc::new(InMemoryChannel::new());
        spawn_farms(&channel).await;
        // Colombia succeeds fast; vietnam worker is silent.
        channel.detach_worker(&WorkerId::new("vietnam")).await;
        let slow_mailbox = channel.attach_worker(WorkerId::new("vietnam")).await;
        WorkerAgent::new("vietnam", Arc::new(Silent)).spawn(slow_mailbox);

        let config = RunConfig {
            max_attempts: 3,
            task_timeout: Duration::from_secs(10),
            dispatch_stagger: Duration::ZERO,
            run_deadline: Duration::from_millis(400),
        };
        let supervisor = Supervisor::new(
            channel,
            Arc::new(RuleDecomposer::new(farm_directory(), "farm")),
        )
        .with_config(config);

        let result = supervisor
            .run(PromptRequest::new("Show total inventory across all farms"))
            .await
            .unwrap();

        assert!(result.partial);
        assert!(result.response.contains("colombia : 5000 lbs"));
        assert!(result.response.contains("vietnam : incomplete"));
    }

    #[tokio::test]
    async fn test_session_id_threads_through_events() {
        let channel = Arc::new(InMemoryChannel::new());
        spawn_farms(&channel).await;
        let supervisor = supervisor(channel);

        let request = PromptRequest::new("ask colombia").with_session_id("session-42");
        let handle = supervisor.submit(request).await.unwrap();
        assert_eq!(handle.run_id().as_str(), "session-42");

        let events: Vec<RunEvent> = handle.into_stream().await.collect().await;
        assert!(events
            .iter()
            .all(|e| e.run_id().as_str() == "session-42"));
    }

    #[tokio::test]
    async fn test_order_reply_parsed_from_single_task() {
        let channel = Arc::new(InMemoryChannel::new());
        let mailbox = channel.attach_worker(WorkerId::new("order-desk")).await;
        WorkerAgent::new("order-desk", Arc::new(OrderDesk)).spawn(mailbox);
        let supervisor = supervisor(channel);

        let result = supervisor
            .run(PromptRequest::new("create order with price 4.25 and quantity 100"))
            .await
            .unwrap();

        assert!(result.order_id.is_some());
        assert!(result.response.contains("order_id:"));
    }
}
