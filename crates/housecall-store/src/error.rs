//! Error types for the call record store.

use crate::persist::PersistenceError;

/// Errors surfaced by call record store operations.
///
/// `NotFound` and `DuplicateId` are caller errors and are returned
/// immediately, never retried. `Persistence` only appears on the load
/// path (startup); runtime save failures are degraded-mode, not errors —
/// they are logged and flagged for reconciliation while the in-memory
/// operation succeeds.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The operation referenced a call id that is not in the store.
    #[error("no call record with id '{0}'")]
    NotFound(String),

    /// A record with this call id already exists.
    #[error("call record with id '{0}' already exists")]
    DuplicateId(String),

    /// A durable read or write failed.
    #[error("persistence failure: {0}")]
    Persistence(#[from] PersistenceError),
}
