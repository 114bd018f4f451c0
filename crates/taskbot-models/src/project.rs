//! Project types for Taskbot.
//!
//! A project is the task-tracking workspace bound one-to-one to a chat.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ChatId, ProjectId};

/// A project bound to a single chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Identifier assigned by the store.
    pub id: ProjectId,

    /// Chat this project belongs to. Unique across projects.
    pub chat_id: ChatId,

    /// Title of the project.
    pub title: String,

    /// Free-form description. Empty when unset.
    #[serde(default)]
    pub description: String,

    /// Archived projects refuse new tasks.
    #[serde(default)]
    pub is_archived: bool,

    /// Hide Done/Cancelled tasks from listings entirely.
    #[serde(default)]
    pub hide_completed: bool,

    /// When the project was created.
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Creates an unsaved project for a chat.
    pub fn new(chat_id: ChatId, title: impl Into<String>) -> Self {
        Self {
            id: ProjectId::default(),
            chat_id,
            title: title.into(),
            description: String::new(),
            is_archived: false,
            hide_completed: false,
            created_at: Utc::now(),
        }
    }

    /// Returns the description, or `None` when it is empty.
    pub fn description(&self) -> Option<&str> {
        if self.description.is_empty() {
            None
        } else {
            Some(&self.description)
        }
    }
}
