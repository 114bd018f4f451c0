//! Mapping between Telegram updates and dispatcher types.

use teloxide::types::{CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, Message, User};

use taskbot_core::{Chat, Event, Keyboard, Sender};
use taskbot_models::{ChatId, PlatformUserId};

/// Display name as "Last First", skipping empty parts.
pub fn full_name(first_name: &str, last_name: Option<&str>) -> String {
    [last_name.unwrap_or_default(), first_name]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn sender(user: &User) -> Sender {
    Sender {
        platform_id: PlatformUserId(user.id.0 as i64),
        full_name: full_name(&user.first_name, user.last_name.as_deref()),
        username: user.username.clone(),
    }
}

fn chat(chat: &teloxide::types::Chat) -> Chat {
    Chat {
        id: ChatId(chat.id.0),
        title: chat.title().map(str::to_string),
        is_private: chat.is_private(),
    }
}

/// Text message event. Messages without text or sender are skipped.
pub fn message_event(msg: &Message) -> Option<Event> {
    let text = msg.text()?;
    let user = msg.from.as_ref()?;
    Some(Event::text(chat(&msg.chat), sender(user), text))
}

/// Button press event. Presses on messages Telegram no longer exposes are skipped.
pub fn callback_event(query: &CallbackQuery) -> Option<Event> {
    let data = query.data.as_deref()?;
    let message = query.message.as_ref()?;
    Some(Event::callback(
        chat(message.chat()),
        sender(&query.from),
        data,
        message.id().0,
    ))
}

/// Renders an inline keyboard with callback buttons.
pub fn inline_keyboard(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.rows.iter().map(|row| {
        row.iter()
            .map(|button| InlineKeyboardButton::callback(button.label.clone(), button.action.to_string()))
            .collect::<Vec<_>>()
    }))
}
