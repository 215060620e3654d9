/*
    errors.rs - Error types for the store subsystem

    Every error carries a stable protocol code (see `StoreError::code`) so the
    ingestion path can decide whether to drop, log or re-queue a message.
*/

use crate::core_store::model::MessageType;
use crate::core_store::store::events::HubEvent;
use std::sync::PoisonError;
use thiserror::Error;

/// Errors that can occur in the store subsystem
#[derive(Debug, Error)]
pub enum StoreError {
    /// Malformed fid, hash or slot key, or a message routed to the wrong store
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Lookup miss
    #[error("Not found: {0}")]
    NotFound(String),

    /// A message with the same hash is already stored
    #[error("{0}")]
    Duplicate(String),

    /// The message lost conflict resolution against the stored winner
    #[error("{0}")]
    Conflict(String),

    /// The message is older than what the store retains for its fid
    #[error("{0}")]
    Prunable(String),

    /// Structural or cryptographic validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Substrate I/O failure
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Protocol error code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::InvalidArgument(_) => "bad_request.invalid_param",
            StoreError::NotFound(_) => "not_found",
            StoreError::Duplicate(_) => "bad_request.duplicate",
            StoreError::Conflict(_) => "bad_request.conflict",
            StoreError::Prunable(_) => "bad_request.prunable",
            StoreError::Validation(_) => "bad_request.validation_failure",
            StoreError::Unavailable(_) => "unavailable.storage_failure",
            StoreError::Serialization(_) => "bad_request.parse_failure",
            StoreError::Internal(_) => "internal_error",
        }
    }

    pub fn duplicate() -> Self {
        StoreError::Duplicate("message has already been merged".to_string())
    }

    /// Conflict error naming the kind of the stored winner
    pub fn conflicts_with(existing: MessageType) -> Self {
        StoreError::Conflict(format!("message conflicts with a more recent {}", existing.name()))
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }

    pub fn is_prunable(&self) -> bool {
        matches!(self, StoreError::Prunable(_))
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Failure of a prune or revoke loop.
///
/// The loop stops at the first failing message; `completed` holds the events
/// that were committed before it.
#[derive(Debug, Error)]
#[error("bulk operation stopped after {} events: {source}", .completed.len())]
pub struct BulkError {
    pub completed: Vec<HubEvent>,
    #[source]
    pub source: StoreError,
}

impl BulkError {
    pub fn new(completed: Vec<HubEvent>, source: StoreError) -> Self {
        BulkError { completed, source }
    }
}

/// Helper to convert poison errors into StoreError
pub(crate) fn handle_poison<T>(_err: PoisonError<T>) -> StoreError {
    StoreError::Internal("Lock poisoned: a thread panicked while holding the lock".to_string())
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(err: r2d2::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
