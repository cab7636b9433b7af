//! Error types for value parsing in glucolog-types.

use thiserror::Error;

/// Errors that can occur when parsing glucose values and their labels.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    /// Unknown reading kind label.
    #[error("Unknown reading kind '{0}': expected 'trend' or 'history'")]
    UnknownKind(String),

    /// Unknown glucose unit label.
    #[error("Unknown glucose unit '{0}': expected 'mgdl' or 'mmol'")]
    UnknownUnit(String),
}

/// Result type alias using glucolog-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
