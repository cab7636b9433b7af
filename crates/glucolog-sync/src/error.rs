//! Error types for glucolog-sync.

use std::path::PathBuf;

/// Result type for glucolog-sync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors a sync task can end with.
///
/// These never reach the caller of a start operation; the coordinator logs
/// them and records them as the task's [`SyncOutcome`](crate::SyncOutcome).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The task observed a cancellation request and stopped.
    #[error("Synchronization cancelled")]
    Cancelled,

    /// Local store error.
    #[error("Store error: {0}")]
    Store(#[from] glucolog_store::Error),

    /// A remote record could not be decoded.
    #[error("Invalid record {path}: {source}")]
    InvalidRecord {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend-specific failure.
    #[error("Backend error: {0}")]
    Backend(String),
}
