//! Fanout supervisor.
//!
//! Turns one caller request into a run: decomposes it into tasks, dispatches
//! each to a worker over the transport channel, applies bounded retries with
//! backoff, and aggregates the terminal results into either a single
//! response (`await_result`) or a stream of run events.

pub mod aggregate;
pub mod authz;
pub mod decompose;
pub mod error;
pub mod retry;
pub mod supervisor;
pub mod table;

pub use aggregate::{AggregatedResult, LineMerger, Merger, TaskFailure};
pub use authz::{AllowAll, Authorizer, DenyList};
pub use decompose::{Decomposer, PromptRequest, RuleDecomposer, TaskSpec, WorkerDirectory};
pub use error::SupervisorError;
pub use retry::{FixedDelay, RetryPolicy};
pub use supervisor::{RunConfig, RunHandle, Supervisor};
pub use table::DispatchTable;
