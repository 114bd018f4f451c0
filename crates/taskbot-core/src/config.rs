//! Runtime settings the dispatcher needs from the host process.

use chrono::Duration;

use taskbot_models::PlatformUserId;

/// Days a Done or Cancelled task stays visible in listings.
pub const RECENCY_WINDOW_DAYS: i64 = 3;

/// Settings for a [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// The bot's own handle, without `@`.
    pub bot_username: String,

    /// Version string reported by the status screen.
    pub version: String,

    /// Users allowed to talk to the bot. Empty means everyone.
    pub allowed_users: Vec<PlatformUserId>,

    /// How long closed tasks remain in listings.
    pub recency_window: Duration,
}

impl BotConfig {
    pub fn new(bot_username: impl Into<String>) -> Self {
        Self {
            bot_username: bot_username.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            allowed_users: Vec::new(),
            recency_window: Duration::days(RECENCY_WINDOW_DAYS),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_allowed_users(mut self, users: Vec<PlatformUserId>) -> Self {
        self.allowed_users = users;
        self
    }

    /// Whether a user may use the bot.
    pub fn is_allowed(&self, user: PlatformUserId) -> bool {
        self.allowed_users.is_empty() || self.allowed_users.contains(&user)
    }

    /// Whether a handle refers to the bot itself.
    pub fn is_bot_handle(&self, handle: &str) -> bool {
        !self.bot_username.is_empty()
            && handle
                .trim_start_matches('@')
                .eq_ignore_ascii_case(&self.bot_username)
    }
}
