//! Outbound messages produced by the dispatcher.

use taskbot_models::ChatId;

use crate::intent::CallbackAction;

/// An inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: CallbackAction,
}

impl Button {
    pub fn new(label: impl Into<String>, action: CallbackAction) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

/// An inline keyboard, row by row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row of buttons.
    pub fn row(mut self, buttons: Vec<Button>) -> Self {
        self.rows.push(buttons);
        self
    }

    /// Appends a row holding a single button.
    pub fn button(self, label: impl Into<String>, action: CallbackAction) -> Self {
        self.row(vec![Button::new(label, action)])
    }

    /// Iterates over every button.
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }

    /// Whether any button triggers `action`.
    pub fn contains(&self, action: &CallbackAction) -> bool {
        self.buttons().any(|b| &b.action == action)
    }
}

/// A side effect for the transport to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Send a new HTML message.
    Send {
        chat_id: ChatId,
        text: String,
        keyboard: Option<Keyboard>,
    },
    /// Replace the keyboard of an existing message.
    EditKeyboard {
        chat_id: ChatId,
        message_id: i32,
        keyboard: Keyboard,
    },
    /// Delete an existing message.
    Delete { chat_id: ChatId, message_id: i32 },
}

impl Reply {
    /// Plain message without buttons.
    pub fn text(chat_id: ChatId, text: impl Into<String>) -> Self {
        Reply::Send {
            chat_id,
            text: text.into(),
            keyboard: None,
        }
    }

    /// Message with an inline keyboard.
    pub fn with_keyboard(chat_id: ChatId, text: impl Into<String>, keyboard: Keyboard) -> Self {
        Reply::Send {
            chat_id,
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }

    /// Text of a `Send` reply.
    pub fn message_text(&self) -> Option<&str> {
        match self {
            Reply::Send { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Keyboard carried by the reply, if any.
    pub fn keyboard(&self) -> Option<&Keyboard> {
        match self {
            Reply::Send { keyboard, .. } => keyboard.as_ref(),
            Reply::EditKeyboard { keyboard, .. } => Some(keyboard),
            Reply::Delete { .. } => None,
        }
    }
}
