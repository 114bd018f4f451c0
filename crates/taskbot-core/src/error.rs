//! Error types for the conversation core.

use taskbot_persistence::PersistenceError;
use thiserror::Error;

/// Errors raised while handling an event.
///
/// Validation and authorization problems are answered in chat and never
/// surface here; this type only carries failures the user cannot fix.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Storage call failed.
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
