//! Telegram bot interface for Taskbot.
//!
//! Converts Telegram updates into `taskbot_core` events, runs them through
//! the conversation dispatcher and delivers the replies as HTML messages
//! with inline keyboards.
//!
//! # Environment Variables
//!
//! Required:
//! - `TELEGRAM_BOT_TOKEN`: Bot token from @BotFather
//!
//! Optional:
//! - `TASKBOT_DATA_DIR`: Data directory (default: `~/.taskbot`)
//! - `TASKBOT_ALLOWED_USERS`: Comma-separated Telegram user ids allowed to
//!   use the bot (default: everyone)
//!
//! # Example
//!
//! ```no_run
//! use clap::Parser;
//! use taskbot_telegram::{Settings, TaskBot};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::parse();
//!     let bot = TaskBot::new(&settings).await?;
//!     bot.start_polling().await?;
//!     Ok(())
//! }
//! ```

pub mod bot;
pub mod config;
pub mod convert;
pub mod error;

pub use bot::{open_store, TaskBot};
pub use config::{Settings, StorageKind};
pub use error::{Result, TelegramError};
