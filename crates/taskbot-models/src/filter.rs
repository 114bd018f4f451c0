//! Task filtering for store queries.

use chrono::NaiveDateTime;

use crate::ids::{ProjectId, UserId};
use crate::task::{Task, TaskStatus};

/// Filter criteria for querying tasks. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    /// Filter by project ID.
    pub project_id: Option<ProjectId>,
    /// Filter by status.
    pub status: Option<TaskStatus>,
    /// Filter by creator.
    pub created_by: Option<UserId>,
    /// Filter by assignee.
    pub assignee: Option<UserId>,
    /// Only tasks with a deadline strictly before this instant.
    pub deadline_before: Option<NaiveDateTime>,
}

impl TaskFilter {
    /// Creates a new empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project_id(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_created_by(mut self, user_id: UserId) -> Self {
        self.created_by = Some(user_id);
        self
    }

    pub fn with_assignee(mut self, user_id: UserId) -> Self {
        self.assignee = Some(user_id);
        self
    }

    pub fn with_deadline_before(mut self, deadline: NaiveDateTime) -> Self {
        self.deadline_before = Some(deadline);
        self
    }

    /// Returns true if the task matches this filter.
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(project_id) = self.project_id {
            if task.project_id != project_id {
                return false;
            }
        }

        if let Some(status) = self.status {
            if task.status != status {
                return false;
            }
        }

        if let Some(created_by) = self.created_by {
            if task.created_by != created_by {
                return false;
            }
        }

        if let Some(assignee) = self.assignee {
            if task.assignee != Some(assignee) {
                return false;
            }
        }

        if let Some(before) = self.deadline_before {
            match task.deadline {
                Some(deadline) if deadline < before => {}
                _ => return false,
            }
        }

        true
    }
}
