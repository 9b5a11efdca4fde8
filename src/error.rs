//! Error types for the consistency checker and its collaborator contracts.
//!
//! `NotFound` is a steady-state condition that drives remediation and is
//! never treated as a failure. Everything else is logged and skipped: no
//! per-tenant or per-object error is allowed to abort a cycle.

use thiserror::Error;

/// Errors from read-side collaborators (tenant store listings/lookups and
/// the physical-side cache).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("transient backend error: {0}")]
    Transient(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Errors from the conditional delete against the physical store.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// The object's identity no longer matches the fingerprint the scan
    /// observed. A benign race: the object was recreated or changed since
    /// it was read, so the delete is dropped rather than retried.
    #[error("delete precondition failed for {name}: object identity changed")]
    PreconditionFailed { name: String },

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("transient backend error: {0}")]
    Transient(String),
}

/// Failure to hand an object back to the event-driven sync queue.
#[derive(Debug, Error)]
#[error("failed to enqueue object: {0}")]
pub struct EnqueueError(pub String);

/// Startup failures of the periodic checker. The only error surfaced to the
/// host process; everything after a successful start is visible through
/// logs and counters only.
#[derive(Debug, Error)]
pub enum CheckerError {
    #[error("failed to wait for backing caches to sync before starting consistency checker")]
    SyncFailed,
}
