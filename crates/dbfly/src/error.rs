//! Error types for the migration engine.

use thiserror::Error;

/// Main error type for migration operations.
///
/// Errors are never retried internally: the first error anywhere in a
/// migration run aborts the remaining nodes of the current version and all
/// remaining versions, and is returned to the caller unchanged.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (unknown dialect, missing table-listing query, etc.)
    #[error("configuration error: {0}")]
    Config(String),

    /// Change source error (unreadable directory, non-UTF-8 script, etc.)
    #[error("source error: {0}")]
    Source(String),

    /// A descriptor uid was requested that the source does not contain.
    #[error("source [{0}] not exists")]
    NotFound(String),

    /// A version string could not be parsed.
    #[error("invalid version {value:?}: {reason}")]
    Version { value: String, reason: String },

    /// Malformed descriptor markup or a missing required attribute.
    #[error("descriptor parse error: {0}")]
    Parse(#[from] quick_xml::DeError),

    /// A change descriptor violates a structural rule (e.g. two primary-key
    /// columns in one table).
    #[error("validation error: {0}")]
    Validation(String),

    /// Any failure surfaced by a [`Driver`](crate::driver::Driver)
    /// implementation, passed through without reinterpretation.
    #[error("driver error: {0}")]
    Driver(String),

    /// A query row did not have the expected column count or types.
    #[error("row decode error: {0}")]
    Row(String),

    /// IO error (file-system sources).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The migration was cancelled before the statement was issued.
    #[error("migration cancelled")]
    Cancelled,
}

impl MigrateError {
    /// Create a `Version` error.
    pub fn version(value: impl Into<String>, reason: impl Into<String>) -> Self {
        MigrateError::Version {
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
