//! In-memory tables shared by the store implementations.

use serde::{Deserialize, Serialize};

use taskbot_models::{
    ChatId, Membership, PlatformUserId, Project, ProjectId, Role, Task, TaskFilter, TaskId, User,
    UserId,
};

use crate::error::{PersistenceError, Result};

/// A (project, user) role row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct MembershipRow {
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub role: Role,
}

/// All rows plus id counters. This is also the on-disk snapshot format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Tables {
    #[serde(default)]
    next_project_id: i64,
    #[serde(default)]
    next_user_id: i64,
    #[serde(default)]
    next_task_id: i64,
    #[serde(default)]
    projects: Vec<Project>,
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    memberships: Vec<MembershipRow>,
    #[serde(default)]
    tasks: Vec<Task>,
}

fn normalize_username(username: &str) -> String {
    username.trim().trim_start_matches('@').to_lowercase()
}

impl Tables {
    /// Checks counters against stored ids after loading a snapshot.
    pub fn repair_counters(&mut self) {
        let max_project = self.projects.iter().map(|p| p.id.get()).max().unwrap_or(0);
        let max_user = self.users.iter().map(|u| u.id.get()).max().unwrap_or(0);
        let max_task = self.tasks.iter().map(|t| t.id.get()).max().unwrap_or(0);
        self.next_project_id = self.next_project_id.max(max_project);
        self.next_user_id = self.next_user_id.max(max_user);
        self.next_task_id = self.next_task_id.max(max_task);
    }

    pub fn project_by_chat(&self, chat_id: ChatId) -> Result<Project> {
        self.projects
            .iter()
            .find(|p| p.chat_id == chat_id)
            .cloned()
            .ok_or_else(|| PersistenceError::not_found("project for chat", chat_id))
    }

    pub fn project(&self, id: ProjectId) -> Result<Project> {
        self.projects
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| PersistenceError::not_found("project", id))
    }

    pub fn insert_project(&mut self, mut project: Project) -> Result<Project> {
        if self.projects.iter().any(|p| p.chat_id == project.chat_id) {
            return Err(PersistenceError::already_exists(
                "project for chat",
                project.chat_id,
            ));
        }
        self.next_project_id += 1;
        project.id = ProjectId(self.next_project_id);
        self.projects.push(project.clone());
        Ok(project)
    }

    pub fn update_project(&mut self, project: &Project) -> Result<()> {
        let slot = self
            .projects
            .iter_mut()
            .find(|p| p.id == project.id)
            .ok_or_else(|| PersistenceError::not_found("project", project.id))?;
        *slot = project.clone();
        Ok(())
    }

    pub fn delete_project(&mut self, id: ProjectId) -> Result<()> {
        let before = self.projects.len();
        self.projects.retain(|p| p.id != id);
        if self.projects.len() == before {
            return Err(PersistenceError::not_found("project", id));
        }
        self.tasks.retain(|t| t.project_id != id);
        self.memberships.retain(|m| m.project_id != id);
        Ok(())
    }

    pub fn user_by_platform_id(&self, platform_id: PlatformUserId) -> Result<User> {
        self.users
            .iter()
            .find(|u| u.platform_id == platform_id)
            .cloned()
            .ok_or_else(|| PersistenceError::not_found("user", platform_id))
    }

    pub fn user(&self, id: UserId) -> Result<User> {
        self.users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| PersistenceError::not_found("user", id))
    }

    pub fn user_by_username(&self, username: &str) -> Result<User> {
        let wanted = normalize_username(username);
        if wanted.is_empty() {
            return Err(PersistenceError::not_found("user", username));
        }
        self.users
            .iter()
            .find(|u| {
                u.username
                    .as_deref()
                    .is_some_and(|name| normalize_username(name) == wanted)
            })
            .cloned()
            .ok_or_else(|| PersistenceError::not_found("user", username))
    }

    pub fn insert_user(&mut self, mut user: User) -> Result<User> {
        if self.users.iter().any(|u| u.platform_id == user.platform_id) {
            return Err(PersistenceError::already_exists("user", user.platform_id));
        }
        self.next_user_id += 1;
        user.id = UserId(self.next_user_id);
        self.users.push(user.clone());
        Ok(user)
    }

    pub fn update_user(&mut self, user: &User) -> Result<()> {
        let slot = self
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| PersistenceError::not_found("user", user.id))?;
        *slot = user.clone();
        Ok(())
    }

    pub fn role(&self, project_id: ProjectId, user_id: UserId) -> Result<Role> {
        self.memberships
            .iter()
            .find(|m| m.project_id == project_id && m.user_id == user_id)
            .map(|m| m.role)
            .ok_or_else(|| {
                PersistenceError::not_found("role", format!("{}/{}", project_id, user_id))
            })
    }

    pub fn add_membership(&mut self, project_id: ProjectId, user_id: UserId, role: Role) -> Result<()> {
        if self
            .memberships
            .iter()
            .any(|m| m.project_id == project_id && m.user_id == user_id)
        {
            return Err(PersistenceError::already_exists(
                "role",
                format!("{}/{}", project_id, user_id),
            ));
        }
        self.memberships.push(MembershipRow {
            project_id,
            user_id,
            role,
        });
        Ok(())
    }

    pub fn update_role(&mut self, project_id: ProjectId, user_id: UserId, role: Role) -> Result<()> {
        let row = self
            .memberships
            .iter_mut()
            .find(|m| m.project_id == project_id && m.user_id == user_id)
            .ok_or_else(|| {
                PersistenceError::not_found("role", format!("{}/{}", project_id, user_id))
            })?;
        row.role = role;
        Ok(())
    }

    pub fn count_members(&self, project_id: ProjectId) -> usize {
        self.memberships
            .iter()
            .filter(|m| m.project_id == project_id)
            .count()
    }

    pub fn list_members(&self, project_id: ProjectId) -> Result<Vec<Membership>> {
        let mut members = self
            .memberships
            .iter()
            .filter(|m| m.project_id == project_id)
            .map(|m| {
                let user = self.user(m.user_id).map_err(|_| {
                    PersistenceError::InvalidData(format!(
                        "membership of project {} references missing user {}",
                        project_id, m.user_id
                    ))
                })?;
                Ok(Membership { user, role: m.role })
            })
            .collect::<Result<Vec<_>>>()?;
        members.sort_by_key(|m| m.user.id);
        Ok(members)
    }

    pub fn insert_task(&mut self, mut task: Task) -> Result<Task> {
        if !self.projects.iter().any(|p| p.id == task.project_id) {
            return Err(PersistenceError::not_found("project", task.project_id));
        }
        self.next_task_id += 1;
        task.id = TaskId(self.next_task_id);
        self.tasks.push(task.clone());
        Ok(task)
    }

    pub fn update_task(&mut self, task: &Task) -> Result<()> {
        let slot = self
            .tasks
            .iter_mut()
            .find(|t| t.id == task.id)
            .ok_or_else(|| PersistenceError::not_found("task", task.id))?;
        *slot = task.clone();
        Ok(())
    }

    pub fn task(&self, id: TaskId) -> Result<Task> {
        self.tasks
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| PersistenceError::not_found("task", id))
    }

    pub fn filter_tasks(&self, filter: &TaskFilter) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.id);
        tasks
    }
}
