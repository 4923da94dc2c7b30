//! Dispatch targets.

use crate::WorkerId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a Task is delivered.
///
/// Every Task addresses exactly one worker. A broadcast run is expanded at
/// decomposition time into one Task per recipient; the `topic` records the
/// group the fan-out was published under so the transport binding can use
/// group delivery where it supports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    /// Direct delivery to one named worker.
    Unicast { worker: WorkerId },
    /// Delivery to one recipient of a named broadcast group.
    Broadcast { topic: String, recipient: WorkerId },
}

impl Target {
    /// Convenience constructor for a unicast target.
    pub fn unicast(worker: impl Into<WorkerId>) -> Self {
        Self::Unicast {
            worker: worker.into(),
        }
    }

    /// Convenience constructor for a broadcast-member target.
    pub fn broadcast(topic: impl Into<String>, recipient: impl Into<WorkerId>) -> Self {
        Self::Broadcast {
            topic: topic.into(),
            recipient: recipient.into(),
        }
    }

    /// The worker this target resolves to.
    pub fn worker(&self) -> &WorkerId {
        match self {
            Self::Unicast { worker } => worker,
            Self::Broadcast { recipient, .. } => recipient,
        }
    }

    /// Returns true if this target is part of a broadcast fan-out.
    pub fn is_broadcast(&self) -> bool {
        matches!(self, Self::Broadcast { .. })
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unicast { worker } => write!(f, "{}", worker),
            Self::Broadcast { topic, recipient } => write!(f, "{}/{}", topic, recipient),
        }
    }
}
