//! Assignee input shared by task creation and task editing.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use taskbot_models::{ProjectId, User};
use taskbot_persistence::UserRepository;

use crate::config::BotConfig;
use crate::error::Result;

/// Keywords meaning "assign it to me", matched case-insensitively.
pub const SELF_KEYWORDS: [&str; 7] = ["me", "self", "myself", "я", "мне", "мое", "себе"];

/// Sentinel for "no value".
pub const SKIP: &str = "-";

/// What the user typed at an assignee prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssigneeInput {
    /// Leave the task unassigned.
    Skip,
    /// Assign to the sender.
    Myself,
    /// Assign to the user with this handle.
    Mention(String),
    /// None of the above.
    Invalid,
}

/// Why an assignee was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssigneeError {
    #[error("Tasks can't be assigned to the bot.")]
    Bot,
    #[error("@{0} hasn't talked to the bot yet.")]
    UnknownUser(String),
    #[error("@{0} is not a member of this project.")]
    NotMember(String),
    #[error("You are not a member of this project.")]
    SelfNotMember,
    #[error("Send @username, 'me' to take it yourself, or '-' to skip.")]
    InvalidFormat,
}

fn mention_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"@(\w+)").expect("Invalid mention pattern"))
}

/// Classifies assignee text.
pub fn parse_assignee(text: &str) -> AssigneeInput {
    let text = text.trim();
    if text == SKIP {
        return AssigneeInput::Skip;
    }

    let lowered = text.to_lowercase();
    if SELF_KEYWORDS.contains(&lowered.as_str()) {
        return AssigneeInput::Myself;
    }

    mention_pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|handle| AssigneeInput::Mention(handle.as_str().to_string()))
        .unwrap_or(AssigneeInput::Invalid)
}

/// Resolves a handle to a project member.
///
/// The outer result carries storage failures; the inner one carries
/// rejections the user can correct.
pub async fn resolve_mention<U>(
    store: &U,
    config: &BotConfig,
    project_id: ProjectId,
    handle: &str,
) -> Result<std::result::Result<User, AssigneeError>>
where
    U: UserRepository + ?Sized,
{
    if config.is_bot_handle(handle) {
        return Ok(Err(AssigneeError::Bot));
    }

    let user = match store.fetch_user_by_username(handle).await {
        Ok(user) => user,
        Err(e) if e.is_not_found() => return Ok(Err(AssigneeError::UnknownUser(handle.to_string()))),
        Err(e) => return Err(e.into()),
    };

    match store.fetch_role(project_id, user.id).await {
        Ok(_) => Ok(Ok(user)),
        Err(e) if e.is_not_found() => Ok(Err(AssigneeError::NotMember(handle.to_string()))),
        Err(e) => Err(e.into()),
    }
}
