//! Main Telegram bot implementation.

use std::sync::Arc;

use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use teloxide::types::{BotCommand, CallbackQuery, ChatId, Message, MessageId, ParseMode};
use tracing::{debug, info, warn};

use taskbot_core::{BotConfig, Command, Reply};
use taskbot_persistence::{MemoryStore, Store};

use crate::config::Settings;
use crate::convert::{callback_event, inline_keyboard, message_event};
use crate::error::Result;

type Conversation = taskbot_core::Dispatcher;

/// Opens the store selected by the settings.
pub async fn open_store(settings: &Settings) -> Result<MemoryStore> {
    match settings.store_path() {
        Some(path) => {
            info!(path = %path.display(), "Using file storage");
            Ok(MemoryStore::open(path).await?)
        }
        None => {
            warn!("Using in-memory storage; data is lost on restart");
            Ok(MemoryStore::new())
        }
    }
}

/// The Telegram front end of Taskbot.
pub struct TaskBot {
    /// The teloxide bot instance.
    bot: Bot,
    /// The bot's own handle, without `@`.
    username: String,
    /// Shared conversation state across handlers.
    conversation: Arc<Conversation>,
}

impl TaskBot {
    /// Connects to Telegram and opens storage.
    pub async fn new(settings: &Settings) -> Result<Self> {
        let bot = Bot::new(settings.token()?);
        let me = bot.get_me().await?;
        let username = me.username().to_string();

        let store: Arc<dyn Store> = Arc::new(open_store(settings).await?);
        let config = BotConfig::new(username.clone()).with_allowed_users(settings.allowed_users());

        Ok(Self {
            bot,
            username,
            conversation: Arc::new(Conversation::new(store, config)),
        })
    }

    /// The bot's username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Registers the command menu and processes updates until Ctrl-C.
    pub async fn start_polling(&self) -> Result<()> {
        info!("Starting Telegram bot in polling mode...");

        let commands: Vec<BotCommand> = Command::ALL
            .iter()
            .map(|(command, description)| BotCommand::new(command.name(), *description))
            .collect();
        if let Err(e) = self.bot.set_my_commands(commands).await {
            warn!(error = %e, "Failed to register command menu");
        }

        let for_callbacks = Arc::clone(&self.conversation);
        let for_messages = Arc::clone(&self.conversation);

        let handler = dptree::entry()
            .branch(
                Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
                    let conversation = Arc::clone(&for_callbacks);
                    async move { handle_callback(bot, q, conversation).await }
                }),
            )
            .branch(
                Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
                    let conversation = Arc::clone(&for_messages);
                    async move { handle_message(bot, msg, conversation).await }
                }),
            );

        info!(username = %self.username, "Bot is running! Send /start to begin.");

        Dispatcher::builder(self.bot.clone(), handler)
            .default_handler(|upd| async move {
                debug!("Unhandled update: {:?}", upd);
            })
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        Ok(())
    }
}

async fn handle_message(bot: Bot, msg: Message, conversation: Arc<Conversation>) -> ResponseResult<()> {
    let Some(event) = message_event(&msg) else {
        return Ok(());
    };
    debug!(chat_id = %msg.chat.id, "Message received");

    let replies = conversation.handle(&event).await;
    deliver(&bot, replies).await;
    Ok(())
}

async fn handle_callback(bot: Bot, q: CallbackQuery, conversation: Arc<Conversation>) -> ResponseResult<()> {
    // Stops the client-side spinner whatever happens next.
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        warn!(error = %e, "Failed to answer callback query");
    }

    let Some(event) = callback_event(&q) else {
        debug!(data = ?q.data, "Callback without message or data");
        return Ok(());
    };

    let replies = conversation.handle(&event).await;
    deliver(&bot, replies).await;
    Ok(())
}

/// Sends replies in order. Failures are logged and skipped.
async fn deliver(bot: &Bot, replies: Vec<Reply>) {
    for reply in replies {
        let result = match reply {
            Reply::Send {
                chat_id,
                text,
                keyboard,
            } => {
                let mut req = bot
                    .send_message(ChatId(chat_id.get()), text)
                    .parse_mode(ParseMode::Html);
                if let Some(keyboard) = keyboard {
                    req = req.reply_markup(inline_keyboard(&keyboard));
                }
                req.await.map(|_| ())
            }
            Reply::EditKeyboard {
                chat_id,
                message_id,
                keyboard,
            } => bot
                .edit_message_reply_markup(ChatId(chat_id.get()), MessageId(message_id))
                .reply_markup(inline_keyboard(&keyboard))
                .await
                .map(|_| ()),
            Reply::Delete {
                chat_id,
                message_id,
            } => bot
                .delete_message(ChatId(chat_id.get()), MessageId(message_id))
                .await
                .map(|_| ()),
        };

        if let Err(e) = result {
            warn!(error = %e, "Failed to deliver reply");
        }
    }
}
