//! Error types for persistence operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during persistence operations.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Entity not found.
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    /// Entity violates a uniqueness constraint.
    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: String, id: String },

    /// Failed to read a file.
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file.
    #[error("failed to write {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize or deserialize data.
    #[error("serialization error: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// Stored data is inconsistent.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl PersistenceError {
    pub(crate) fn not_found(kind: &str, id: impl ToString) -> Self {
        Self::NotFound {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }

    pub(crate) fn already_exists(kind: &str, id: impl ToString) -> Self {
        Self::AlreadyExists {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }

    /// Returns true when the error means the entity is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;
