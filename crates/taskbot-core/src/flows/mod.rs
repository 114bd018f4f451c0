//! Flow engines.
//!
//! Each step takes the current flow state plus one user turn and returns an
//! [`Outcome`]: what to do with the session and which replies to send. The
//! dispatcher applies the session change; flows never touch the session
//! store directly.

pub mod project;
pub mod task_creation;
pub mod task_edit;

use tracing::warn;

use taskbot_models::{ChatId, Project, Task, TaskId, UserId};
use taskbot_persistence::{Store, UserRepository};

use crate::auth::is_manager;
use crate::clock::Clock;
use crate::config::BotConfig;
use crate::error::Result;
use crate::event::{Event, Sender};
use crate::reply::Reply;
use crate::session::Flow;
use crate::views;

/// Answer to anything that needs a project in a chat without one.
pub(crate) const NO_PROJECT: &str = "❌ This chat has no project yet. Create one with /start.";

/// Collaborators available to a flow step.
pub struct FlowContext<'a> {
    pub store: &'a dyn Store,
    pub config: &'a BotConfig,
    pub clock: &'a dyn Clock,
    pub event: &'a Event,
}

impl FlowContext<'_> {
    pub fn chat_id(&self) -> ChatId {
        self.event.chat.id
    }

    pub fn sender(&self) -> &Sender {
        &self.event.sender
    }

    /// Plain text reply to the current chat.
    pub fn text(&self, text: impl Into<String>) -> Reply {
        Reply::text(self.chat_id(), text)
    }

    /// Reply rendered from a view.
    pub fn view(&self, (text, keyboard): (String, crate::reply::Keyboard)) -> Reply {
        Reply::with_keyboard(self.chat_id(), text, keyboard)
    }

    /// Main menu for the sender.
    pub async fn main_menu(&self, project: &Project) -> Result<Reply> {
        let manager = is_manager(self.store, project.id, self.sender().platform_id).await?;
        Ok(self.view(views::main_menu(project, manager)))
    }

    /// Task card for the sender.
    pub async fn task_detail(&self, task: &Task) -> Result<Reply> {
        let assignee = match task.assignee {
            Some(id) => Some(self.user_name(id).await),
            None => None,
        };
        let manager = is_manager(self.store, task.project_id, self.sender().platform_id).await?;
        Ok(self.view(views::task_detail(task, assignee.as_deref(), manager)))
    }

    /// Display name of a stored user, falling back to the raw id.
    pub async fn user_name(&self, id: UserId) -> String {
        match self.store.fetch_user(id).await {
            Ok(user) => user.display_name(),
            Err(e) => {
                if !e.is_not_found() {
                    warn!(user_id = %id, error = %e, "Could not load user name");
                }
                format!("ID: {}", id)
            }
        }
    }
}

/// What to do with the sender's session after a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// Leave the session as it is.
    Keep,
    /// Begin a new flow, replacing any other one.
    Start(Flow),
    /// Advance the current flow.
    Set(Flow),
    /// End the current flow.
    Clear,
    /// End the session only if it is an edit of this task.
    EndEdit(TaskId),
}

/// Result of one flow step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub session: SessionUpdate,
    pub replies: Vec<Reply>,
}

impl Outcome {
    pub fn new(session: SessionUpdate) -> Self {
        Self {
            session,
            replies: Vec::new(),
        }
    }

    pub fn keep() -> Self {
        Self::new(SessionUpdate::Keep)
    }

    pub fn start(flow: Flow) -> Self {
        Self::new(SessionUpdate::Start(flow))
    }

    pub fn set(flow: Flow) -> Self {
        Self::new(SessionUpdate::Set(flow))
    }

    pub fn clear() -> Self {
        Self::new(SessionUpdate::Clear)
    }

    /// Appends a reply.
    pub fn reply(mut self, reply: Reply) -> Self {
        self.replies.push(reply);
        self
    }
}
