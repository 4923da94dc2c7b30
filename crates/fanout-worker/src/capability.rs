//! The external capability boundary.

use async_trait::async_trait;
use thiserror::Error;

/// Errors a capability may signal instead of producing a result.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The payload could not be acted on (e.g. missing order parameters).
    #[error("Unsupported request: {0}")]
    UnsupportedRequest(String),

    /// The underlying resource is unavailable (rate limited, offline, ...).
    #[error("Capability unavailable: {0}")]
    Unavailable(String),
}

/// One unit of replaceable work: turn an opaque instruction string into a
/// plain-text result.
///
/// Implementations must be idempotent under at-most-once redelivery: the
/// same payload may arrive more than once if an earlier reply was lost in
/// transit, and reprocessing it must be safe.
#[async_trait]
pub trait Capability: Send + Sync {
    async fn handle(&self, payload: &str) -> Result<String, CapabilityError>;
}
