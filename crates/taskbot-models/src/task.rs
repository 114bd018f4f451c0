//! Task types for Taskbot.
//!
//! Tasks belong to a project and move through a closed set of statuses.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ids::{ProjectId, TaskId, UserId};

/// Status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not yet planned.
    Backlog,
    /// Planned, not started.
    #[default]
    Todo,
    /// Being worked on.
    InProgress,
    /// Finished.
    Done,
    /// Abandoned.
    Cancelled,
    /// Paused.
    OnHold,
}

impl TaskStatus {
    /// Every status, in display order.
    pub const ALL: [TaskStatus; 6] = [
        TaskStatus::Backlog,
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Done,
        TaskStatus::Cancelled,
        TaskStatus::OnHold,
    ];

    /// Wire name, also used in callback payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Backlog => "backlog",
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::OnHold => "on_hold",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Backlog => "Backlog",
            TaskStatus::Todo => "To do",
            TaskStatus::InProgress => "In progress",
            TaskStatus::Done => "Done",
            TaskStatus::Cancelled => "Cancelled",
            TaskStatus::OnHold => "On hold",
        }
    }

    /// Emoji marker used in listings.
    pub fn emoji(self) -> &'static str {
        match self {
            TaskStatus::Backlog => "📥",
            TaskStatus::Todo => "📋",
            TaskStatus::InProgress => "🔄",
            TaskStatus::Done => "✅",
            TaskStatus::Cancelled => "❌",
            TaskStatus::OnHold => "⏸️",
        }
    }

    /// Done and Cancelled are terminal.
    pub fn is_closed(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Cancelled)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown task status: {}", s))
    }
}

/// Editable task field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskField {
    Title,
    Description,
    Status,
    Deadline,
    Assignee,
}

impl TaskField {
    pub const ALL: [TaskField; 5] = [
        TaskField::Title,
        TaskField::Description,
        TaskField::Status,
        TaskField::Deadline,
        TaskField::Assignee,
    ];

    /// Wire name, also used in callback payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskField::Title => "title",
            TaskField::Description => "description",
            TaskField::Status => "status",
            TaskField::Deadline => "deadline",
            TaskField::Assignee => "assignee",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            TaskField::Title => "Title",
            TaskField::Description => "Description",
            TaskField::Status => "Status",
            TaskField::Deadline => "Deadline",
            TaskField::Assignee => "Assignee",
        }
    }

    /// Whether a dedicated "clear" action exists for this field.
    pub fn is_clearable(self) -> bool {
        matches!(
            self,
            TaskField::Description | TaskField::Deadline | TaskField::Assignee
        )
    }
}

impl fmt::Display for TaskField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| format!("unknown task field: {}", s))
    }
}

/// A unit of work within a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Identifier assigned by the store.
    pub id: TaskId,

    /// Owning project.
    pub project_id: ProjectId,

    pub title: String,

    /// Free-form description. Empty when unset.
    #[serde(default)]
    pub description: String,

    pub status: TaskStatus,

    /// End-of-day deadline in the bot's local time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDateTime>,

    pub created_by: UserId,

    pub updated_by: UserId,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<UserId>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates an unsaved task in the Todo status.
    pub fn new(project_id: ProjectId, title: impl Into<String>, created_by: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::default(),
            project_id,
            title: title.into(),
            description: String::new(),
            status: TaskStatus::Todo,
            deadline: None,
            created_by,
            updated_by: created_by,
            assignee: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Records who changed the task and when.
    pub fn touch(&mut self, updated_by: UserId, at: DateTime<Utc>) {
        self.updated_by = updated_by;
        self.updated_at = at;
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
