//! Authorization seam for dispatch targets.
//!
//! The identity/policy service is an external collaborator; the supervisor
//! only needs a yes/no answer per worker, checked once before the first
//! dispatch attempt. A denied target becomes an immediately failed task and
//! is never retried.

use std::collections::HashSet;

use async_trait::async_trait;
use fanout_core::WorkerId;

/// External yes/no authorization check.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// `Err(reason)` marks the target's task failed without dispatch.
    async fn authorize(&self, worker: &WorkerId) -> Result<(), String>;
}

/// Permits every target.
pub struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn authorize(&self, _worker: &WorkerId) -> Result<(), String> {
        Ok(())
    }
}

/// Denies a static set of workers, permits the rest.
pub struct DenyList {
    denied: HashSet<WorkerId>,
}

impl DenyList {
    pub fn new(denied: impl IntoIterator<Item = WorkerId>) -> Self {
        Self {
            denied: denied.into_iter().collect(),
        }
    }
}

#[async_trait]
impl Authorizer for DenyList {
    async fn authorize(&self, worker: &WorkerId) -> Result<(), String> {
        if self.denied.contains(worker) {
            Err(format!("no verified identity badge for '{worker}'"))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allow_all() {
        assert!(AllowAll.authorize(&WorkerId::new("anyone")).await.is_ok());
    }

    #[tokio::test]
    async fn test_deny_list() {
        let authz = DenyList::new([WorkerId::new("brazil")]);
        assert!(authz.authorize(&WorkerId::new("brazil")).await.is_err());
        assert!(authz.authorize(&WorkerId::new("colombia")).await.is_ok());
    }
}
