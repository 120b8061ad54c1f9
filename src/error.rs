use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Machine-readable rejection reason returned to callers so they can decide
/// whether a retry with backoff makes sense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", content = "detail", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    /// A requested SKU is restricted while system-wide throttling is active.
    RestrictedSku(String),
    /// The target store is reporting overload.
    StoreOverloaded(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::RestrictedSku(sku) => write!(f, "SKU {} is restricted", sku),
            RejectReason::StoreOverloaded(store) => write!(f, "store {} is overloaded", store),
        }
    }
}

#[derive(Debug, Error)]
pub enum AdmissionError {
    /// Malformed request. Caller's fault, never retried automatically,
    /// and the idempotency key is not consumed.
    #[error("invalid order request: {0}")]
    Validation(String),

    /// Capacity rejection. Safe to retry with backoff under the same
    /// idempotency key; the key is not consumed by a rejection.
    #[error("order rejected: {reason}")]
    Rejected { reason: RejectReason },
}
