//! Error types for glucolog-store.

use std::path::PathBuf;

/// Result type for glucolog-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in glucolog-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid timestamp.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Stored value could not be decoded.
    #[error("Invalid stored value: {0}")]
    InvalidValue(#[from] glucolog_types::ParseError),

    /// A live query failed or stopped.
    #[error("Live query error: {0}")]
    LiveQuery(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
