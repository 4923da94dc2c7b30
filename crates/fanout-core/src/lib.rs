//! Fanout Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/transport
//! - HTTP
//! - Runtime specifics
//!
//! All types here represent the core business domain of fanout:
//! runs, tasks, worker replies, and the events a run emits.

pub mod error;
pub mod event;
pub mod ids;
pub mod reply;
pub mod status;
pub mod target;
pub mod task;

// Re-export commonly used types
pub use error::CoreError;
pub use event::RunEvent;
pub use ids::{RunId, TaskId, WorkerId};
pub use reply::WorkerReply;
pub use status::{RunMode, RunState, TaskStatus};
pub use target::Target;
pub use task::Task;
