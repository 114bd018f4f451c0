//! Command-line and environment configuration.
//!
//! Every flag has an environment fallback, and `.env` files are loaded
//! by the binary before parsing.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use taskbot_models::PlatformUserId;

use crate::error::{Result, TelegramError};

/// Default data directory name under home.
const DEFAULT_DATA_DIR: &str = ".taskbot";

/// Snapshot file name inside the data directory.
const STORE_FILE: &str = "taskbot.json";

/// Where projects, users and tasks are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageKind {
    /// JSON snapshot in the data directory.
    File,
    /// Process memory only; lost on restart.
    Memory,
}

/// Taskbot - a conversational task tracker for Telegram chats
#[derive(Parser, Debug, Clone)]
#[command(name = "taskbot-telegram")]
#[command(about = "Telegram bot that tracks tasks per chat")]
pub struct Settings {
    /// Bot token from @BotFather
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Directory for persistent data (default: ~/.taskbot)
    #[arg(long, env = "TASKBOT_DATA_DIR")]
    pub data_dir: Option<String>,

    /// Storage backend
    #[arg(long, value_enum, default_value = "file")]
    pub storage: StorageKind,

    /// Comma-separated Telegram user ids allowed to use the bot (default: everyone)
    #[arg(long, env = "TASKBOT_ALLOWED_USERS", value_delimiter = ',')]
    pub allowed_users: Vec<i64>,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Settings {
    /// The bot token, if one was given.
    pub fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(TelegramError::NoToken)
    }

    /// Resolves the data directory.
    ///
    /// The directory is determined by:
    /// 1. `--data-dir` / `TASKBOT_DATA_DIR`, with `~` expanded
    /// 2. `~/.taskbot` if a home directory is available
    /// 3. `.taskbot` in the current directory as fallback
    pub fn data_dir(&self) -> PathBuf {
        match &self.data_dir {
            Some(dir) => PathBuf::from(shellexpand::tilde(dir).to_string()),
            None => dirs::home_dir()
                .map(|h| h.join(DEFAULT_DATA_DIR))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
        }
    }

    /// Snapshot path for file storage, `None` for memory storage.
    pub fn store_path(&self) -> Option<PathBuf> {
        match self.storage {
            StorageKind::File => Some(self.data_dir().join(STORE_FILE)),
            StorageKind::Memory => None,
        }
    }

    /// Allow-list as platform ids.
    pub fn allowed_users(&self) -> Vec<PlatformUserId> {
        self.allowed_users.iter().copied().map(PlatformUserId).collect()
    }

    /// Log filter for the verbosity level.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "taskbot_telegram=info,taskbot_core=info,taskbot_persistence=info,teloxide=warn",
            1 => "taskbot_telegram=debug,taskbot_core=debug,taskbot_persistence=debug,teloxide=info",
            2 => "taskbot_telegram=trace,taskbot_core=trace,taskbot_persistence=trace,teloxide=debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Settings {
        let mut argv = vec!["taskbot-telegram"];
        argv.extend_from_slice(args);
        Settings::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_allowed_users_are_comma_separated() {
        let settings = parse(&["--token", "t", "--allowed-users", "1,22,333"]);
        assert_eq!(
            settings.allowed_users(),
            vec![PlatformUserId(1), PlatformUserId(22), PlatformUserId(333)]
        );
    }

    #[test]
    fn test_blank_token_is_missing() {
        let settings = parse(&["--token", "  "]);
        assert!(matches!(settings.token(), Err(TelegramError::NoToken)));
    }

    #[test]
    fn test_store_path_follows_storage_kind() {
        let file = parse(&["--token", "t", "--data-dir", "/tmp/tb"]);
        assert_eq!(file.store_path(), Some(PathBuf::from("/tmp/tb/taskbot.json")));

        let memory = parse(&["--token", "t", "--storage", "memory"]);
        assert_eq!(memory.store_path(), None);
    }

    #[test]
    fn test_data_dir_expands_tilde() {
        let settings = parse(&["--token", "t", "--data-dir", "~/bots"]);
        if let Some(home) = dirs::home_dir() {
            assert_eq!(settings.data_dir(), home.join("bots"));
        }
    }

    #[test]
    fn test_verbosity_filters() {
        assert!(parse(&["-vv"]).log_filter().contains("taskbot_core=trace"));
        assert_eq!(parse(&["-vvvv"]).log_filter(), "trace");
    }
}
