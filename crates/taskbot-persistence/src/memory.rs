//! Table-backed store, optionally snapshotted to a JSON file.
//!
//! Without a snapshot path the store lives only for the process lifetime.
//! With one, every mutation rewrites the snapshot atomically while the write
//! lock is held, so the file always matches a state the store has been in.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

use taskbot_models::{
    ChatId, Membership, PlatformUserId, Project, ProjectId, Role, Task, TaskFilter, TaskId, User,
    UserId,
};

use crate::atomic::{read_snapshot, write_snapshot};
use crate::error::Result;
use crate::repository::{ProjectRepository, TaskRepository, UserRepository};
use crate::tables::Tables;

/// Store holding every table in memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    snapshot: Option<PathBuf>,
}

impl MemoryStore {
    /// Creates an empty, purely in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a store persisted at `path`, loading the existing snapshot if any.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let tables = match read_snapshot::<Tables>(&path)? {
            Some(mut tables) => {
                tables.repair_counters();
                info!(path = %path.display(), "Loaded store snapshot");
                tables
            }
            None => {
                debug!(path = %path.display(), "No existing snapshot, starting empty");
                Tables::default()
            }
        };

        Ok(Self {
            tables: RwLock::new(tables),
            snapshot: Some(path),
        })
    }

    /// Snapshot file backing this store, if any.
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    /// Applies a mutation and persists the result.
    ///
    /// With a snapshot configured the mutation runs on a copy that replaces
    /// the live tables only once the snapshot is written, so a failed write
    /// leaves the store unchanged.
    async fn mutate<T>(&self, op: impl FnOnce(&mut Tables) -> Result<T>) -> Result<T> {
        let mut tables = self.tables.write().await;
        let Some(path) = &self.snapshot else {
            return op(&mut tables);
        };

        let mut staged = tables.clone();
        let value = op(&mut staged)?;
        write_snapshot(path, &staged)?;
        *tables = staged;
        Ok(value)
    }
}

#[async_trait]
impl ProjectRepository for MemoryStore {
    async fn fetch_project_by_chat(&self, chat_id: ChatId) -> Result<Project> {
        self.tables.read().await.project_by_chat(chat_id)
    }

    async fn fetch_project(&self, id: ProjectId) -> Result<Project> {
        self.tables.read().await.project(id)
    }

    async fn create_project(&self, project: Project) -> Result<Project> {
        self.mutate(|t| t.insert_project(project)).await
    }

    async fn update_project(&self, project: &Project) -> Result<()> {
        self.mutate(|t| t.update_project(project)).await
    }

    async fn delete_project(&self, id: ProjectId) -> Result<()> {
        self.mutate(|t| t.delete_project(id)).await
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn fetch_user_by_platform_id(&self, platform_id: PlatformUserId) -> Result<User> {
        self.tables.read().await.user_by_platform_id(platform_id)
    }

    async fn fetch_user(&self, id: UserId) -> Result<User> {
        self.tables.read().await.user(id)
    }

    async fn fetch_user_by_username(&self, username: &str) -> Result<User> {
        self.tables.read().await.user_by_username(username)
    }

    async fn create_user(&self, user: User) -> Result<User> {
        self.mutate(|t| t.insert_user(user)).await
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        self.mutate(|t| t.update_user(user)).await
    }

    async fn fetch_role(&self, project_id: ProjectId, user_id: UserId) -> Result<Role> {
        self.tables.read().await.role(project_id, user_id)
    }

    async fn add_membership(
        &self,
        project_id: ProjectId,
        user_id: UserId,
        role: Role,
    ) -> Result<()> {
        self.mutate(|t| t.add_membership(project_id, user_id, role))
            .await
    }

    async fn update_role(&self, project_id: ProjectId, user_id: UserId, role: Role) -> Result<()> {
        self.mutate(|t| t.update_role(project_id, user_id, role))
            .await
    }

    async fn count_members(&self, project_id: ProjectId) -> Result<usize> {
        Ok(self.tables.read().await.count_members(project_id))
    }

    async fn list_members(&self, project_id: ProjectId) -> Result<Vec<Membership>> {
        self.tables.read().await.list_members(project_id)
    }
}

#[async_trait]
impl TaskRepository for MemoryStore {
    async fn create_task(&self, task: Task) -> Result<Task> {
        self.mutate(|t| t.insert_task(task)).await
    }

    async fn update_task(&self, task: &Task) -> Result<()> {
        self.mutate(|t| t.update_task(task)).await
    }

    async fn fetch_task(&self, id: TaskId) -> Result<Task> {
        self.tables.read().await.task(id)
    }

    async fn filter_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        Ok(self.tables.read().await.filter_tasks(filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PersistenceError;
    use taskbot_models::TaskStatus;
    use tempfile::tempdir;

    async fn seeded(store: &MemoryStore) -> (Project, User) {
        let project = store
            .create_project(Project::new(ChatId(-100), "Backend"))
            .await
            .unwrap();
        let user = store
            .create_user(
                User::new(PlatformUserId(500))
                    .with_full_name("Ada Lovelace")
                    .with_username(Some("ada".to_string())),
            )
            .await
            .unwrap();
        store
            .add_membership(project.id, user.id, Role::Manager)
            .await
            .unwrap();
        (project, user)
    }

    #[tokio::test]
    async fn test_fetch_missing_project_is_not_found() {
        let store = MemoryStore::new();
        let err = store.fetch_project_by_chat(ChatId(1)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_membership_lifecycle() {
        let store = MemoryStore::new();
        let (project, user) = seeded(&store).await;

        assert_eq!(store.count_members(project.id).await.unwrap(), 1);
        assert_eq!(
            store.fetch_role(project.id, user.id).await.unwrap(),
            Role::Manager
        );

        let err = store
            .add_membership(project.id, user.id, Role::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::AlreadyExists { .. }));

        store
            .update_role(project.id, user.id, Role::Member)
            .await
            .unwrap();
        let members = store.list_members(project.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].role, Role::Member);
        assert_eq!(members[0].user.full_name, "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_filter_tasks_by_assignee() {
        let store = MemoryStore::new();
        let (project, user) = seeded(&store).await;

        let mut mine = Task::new(project.id, "Mine", user.id);
        mine.assignee = Some(user.id);
        store.create_task(mine).await.unwrap();
        store
            .create_task(Task::new(project.id, "Unassigned", user.id))
            .await
            .unwrap();

        let tasks = store
            .filter_tasks(&TaskFilter::new().with_assignee(user.id))
            .await
            .unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Mine");
    }

    #[tokio::test]
    async fn test_delete_project_cascades() {
        let store = MemoryStore::new();
        let (project, user) = seeded(&store).await;
        let task = store
            .create_task(Task::new(project.id, "Doomed", user.id))
            .await
            .unwrap();

        store.delete_project(project.id).await.unwrap();

        assert!(store.fetch_project(project.id).await.unwrap_err().is_not_found());
        assert!(store.fetch_task(task.id).await.unwrap_err().is_not_found());
        assert_eq!(store.count_members(project.id).await.unwrap(), 0);
        // Users are global and survive the project.
        assert!(store.fetch_user(user.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_snapshot_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("taskbot.json");

        let task_id = {
            let store = MemoryStore::open(&path).await.unwrap();
            let (project, user) = seeded(&store).await;
            let mut task = store
                .create_task(Task::new(project.id, "Persist me", user.id))
                .await
                .unwrap();
            task.status = TaskStatus::InProgress;
            store.update_task(&task).await.unwrap();
            task.id
        };

        let reopened = MemoryStore::open(&path).await.unwrap();
        let task = reopened.fetch_task(task_id).await.unwrap();
        assert_eq!(task.title, "Persist me");
        assert_eq!(task.status, TaskStatus::InProgress);

        let user = reopened.fetch_user_by_username("ADA").await.unwrap();
        let next = reopened
            .create_user(User::new(PlatformUserId(501)))
            .await
            .unwrap();
        assert!(next.id > user.id);
    }

    #[tokio::test]
    async fn test_failed_snapshot_write_leaves_store_unchanged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("taskbot.json");
        let store = MemoryStore::open(&path).await.unwrap();
        let (project, user) = seeded(&store).await;

        // A directory at the snapshot path makes every write fail.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let err = store
            .create_project(Project::new(ChatId(-7), "Lost"))
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::WriteError { .. }));
        assert!(store
            .fetch_project_by_chat(ChatId(-7))
            .await
            .unwrap_err()
            .is_not_found());

        store
            .create_task(Task::new(project.id, "Kept out", user.id))
            .await
            .unwrap_err();
        assert!(store
            .filter_tasks(&TaskFilter::new().with_project_id(project.id))
            .await
            .unwrap()
            .is_empty());

        store.delete_project(project.id).await.unwrap_err();
        assert!(store.fetch_project(project.id).await.is_ok());
        assert_eq!(store.count_members(project.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_mutation_does_not_write_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("taskbot.json");
        let store = MemoryStore::open(&path).await.unwrap();

        let err = store
            .update_task(&Task::new(ProjectId(1), "Ghost", UserId(1)))
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(!path.exists());
    }
}
