//! Error types for the Telegram bot.

use taskbot_persistence::PersistenceError;
use thiserror::Error;

/// Errors that can occur while starting or running the bot.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Bot token not provided.
    #[error("Telegram bot token not set. Set TELEGRAM_BOT_TOKEN or pass --token.")]
    NoToken,

    /// Failed to start the bot.
    #[error("Failed to start bot: {0}")]
    BotStartFailed(String),

    /// Storage could not be opened.
    #[error("Storage error: {0}")]
    Storage(#[from] PersistenceError),
}

/// Result type for Telegram operations.
pub type Result<T> = std::result::Result<T, TelegramError>;

impl From<teloxide::RequestError> for TelegramError {
    fn from(e: teloxide::RequestError) -> Self {
        TelegramError::BotStartFailed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::{ApiError, RequestError};

    #[test]
    fn test_request_error_is_a_start_failure() {
        let err: TelegramError = RequestError::Api(ApiError::InvalidToken).into();
        assert!(matches!(err, TelegramError::BotStartFailed(_)));
        assert!(err.to_string().starts_with("Failed to start bot"));
    }
}
