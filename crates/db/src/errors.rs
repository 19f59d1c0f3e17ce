//! Errors returned by the bridge tables.

use thiserror::Error;

/// Errors returned by the bridge tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DbError {
    /// An entry with the same key already exists.
    #[error("duplicate entry: {0}")]
    DuplicateEntry(String),

    /// No entry exists for the key.
    #[error("could not find entry: {0}")]
    NotFound(String),
}

/// Result type of the bridge tables.
pub type DbResult<T> = Result<T, DbError>;
