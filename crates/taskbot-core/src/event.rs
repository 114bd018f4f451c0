//! Transport-neutral inbound events.

use taskbot_models::{ChatId, PlatformUserId};

/// Chat an event arrived in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chat {
    pub id: ChatId,
    /// Group title. `None` for private chats.
    pub title: Option<String>,
    pub is_private: bool,
}

/// Platform identity of whoever sent the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub platform_id: PlatformUserId,
    /// Display name; may be empty.
    pub full_name: String,
    /// Handle without `@`.
    pub username: Option<String>,
}

/// What the event carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A plain text message, including slash-commands.
    Text(String),
    /// A button press on one of the bot's messages.
    Callback { data: String, message_id: i32 },
}

/// One inbound message or button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub chat: Chat,
    pub sender: Sender,
    pub payload: Payload,
}

impl Event {
    /// Builds a text event.
    pub fn text(chat: Chat, sender: Sender, text: impl Into<String>) -> Self {
        Self {
            chat,
            sender,
            payload: Payload::Text(text.into()),
        }
    }

    /// Builds a callback event.
    pub fn callback(chat: Chat, sender: Sender, data: impl Into<String>, message_id: i32) -> Self {
        Self {
            chat,
            sender,
            payload: Payload::Callback {
                data: data.into(),
                message_id,
            },
        }
    }

    /// Title for a project created from this chat.
    pub fn project_title(&self) -> String {
        match &self.chat.title {
            Some(title) if !title.trim().is_empty() => title.trim().to_string(),
            _ if !self.sender.full_name.is_empty() => self.sender.full_name.clone(),
            _ => format!("Chat {}", self.chat.id),
        }
    }
}
