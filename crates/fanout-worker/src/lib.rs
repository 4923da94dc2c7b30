//! Fanout worker runtime.
//!
//! A worker is a stateless loop around one [`Capability`]: receive a task
//! envelope, invoke the capability on its payload, reply with plain text.
//! The actual work (scraping, yield estimation, order fulfillment) lives
//! behind the capability seam and is replaceable.

pub mod agent;
pub mod capability;
pub mod demo;

pub use agent::WorkerAgent;
pub use capability::{Capability, CapabilityError};
pub use demo::{FarmInventory, OrderDesk, PageSummarizer};
