//! Repository traits consumed by the conversation core.
//!
//! Every lookup reports an absent entity as [`PersistenceError::NotFound`]
//! so callers can branch on it without confusing it with storage failures.
//!
//! [`PersistenceError::NotFound`]: crate::PersistenceError::NotFound

use async_trait::async_trait;

use taskbot_models::{
    ChatId, Membership, PlatformUserId, Project, ProjectId, Role, Task, TaskFilter, TaskId, User,
    UserId,
};

use crate::error::Result;

/// Storage for projects.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Fetches the project bound to a chat.
    async fn fetch_project_by_chat(&self, chat_id: ChatId) -> Result<Project>;

    /// Fetches a project by id.
    async fn fetch_project(&self, id: ProjectId) -> Result<Project>;

    /// Inserts a project and returns it with its assigned id.
    ///
    /// Fails with `AlreadyExists` if the chat already has a project.
    async fn create_project(&self, project: Project) -> Result<Project>;

    /// Replaces a stored project.
    async fn update_project(&self, project: &Project) -> Result<()>;

    /// Deletes a project together with its tasks and memberships.
    async fn delete_project(&self, id: ProjectId) -> Result<()>;
}

/// Storage for users and their project memberships.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn fetch_user_by_platform_id(&self, platform_id: PlatformUserId) -> Result<User>;

    async fn fetch_user(&self, id: UserId) -> Result<User>;

    /// Looks a user up by handle, ignoring case and a leading `@`.
    async fn fetch_user_by_username(&self, username: &str) -> Result<User>;

    /// Inserts a user and returns it with its assigned id.
    async fn create_user(&self, user: User) -> Result<User>;

    async fn update_user(&self, user: &User) -> Result<()>;

    /// Fetches the role of a user within a project.
    async fn fetch_role(&self, project_id: ProjectId, user_id: UserId) -> Result<Role>;

    /// Adds a membership. Fails with `AlreadyExists` if one is present.
    async fn add_membership(&self, project_id: ProjectId, user_id: UserId, role: Role)
        -> Result<()>;

    /// Changes the role of an existing membership.
    async fn update_role(&self, project_id: ProjectId, user_id: UserId, role: Role) -> Result<()>;

    async fn count_members(&self, project_id: ProjectId) -> Result<usize>;

    /// Lists members of a project ordered by user id.
    async fn list_members(&self, project_id: ProjectId) -> Result<Vec<Membership>>;
}

/// Storage for tasks.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Inserts a task and returns it with its assigned id.
    async fn create_task(&self, task: Task) -> Result<Task>;

    async fn update_task(&self, task: &Task) -> Result<()>;

    async fn fetch_task(&self, id: TaskId) -> Result<Task>;

    /// Returns matching tasks ordered by id.
    async fn filter_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>>;
}

/// Everything the conversation core needs from storage.
pub trait Store: ProjectRepository + UserRepository + TaskRepository {}

impl<T> Store for T where T: ProjectRepository + UserRepository + TaskRepository {}
