//! Taskbot Telegram binary.
//!
//! Start the bot with:
//! ```bash
//! TELEGRAM_BOT_TOKEN=xxx cargo run -p taskbot-telegram
//! ```

use clap::Parser;
use taskbot_telegram::{Settings, TaskBot};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Environment files must be loaded before clap reads env fallbacks.
    let _ = dotenvy::from_filename(".env.local").or_else(|_| dotenvy::dotenv());

    let settings = Settings::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(settings.log_filter()))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let bot = match TaskBot::new(&settings).await {
        Ok(bot) => bot,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start bot");
            return Err(e.into());
        }
    };
    tracing::info!(username = %bot.username(), "Bot initialized successfully");

    println!("\n[robot] Taskbot");
    println!("   Bot: @{}", bot.username());
    match settings.store_path() {
        Some(path) => println!("   Storage: {}", path.display()),
        None => println!("   Storage: memory"),
    }
    println!("\n[phone] Add the bot to a chat and send /start to begin");
    println!("   Press Ctrl+C to stop\n");

    bot.start_polling().await?;

    Ok(())
}
