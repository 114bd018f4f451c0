//! Per-user conversation state.
//!
//! A user has at most one active [`Flow`]. Sessions live in process memory
//! only and are lost on restart.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use taskbot_models::{PlatformUserId, ProjectId, TaskField, TaskId, UserId};

/// Steps of the task creation flow, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskCreationStep {
    Title,
    Description,
    Assignee,
    Deadline,
}

/// Fields collected so far while creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub project_id: ProjectId,
    pub created_by: UserId,
    pub step: TaskCreationStep,
    pub title: String,
    pub description: String,
    pub assignee: Option<UserId>,
}

impl TaskDraft {
    pub fn new(project_id: ProjectId, created_by: UserId) -> Self {
        Self {
            project_id,
            created_by,
            step: TaskCreationStep::Title,
            title: String::new(),
            description: String::new(),
            assignee: None,
        }
    }
}

/// An active multi-turn interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    TaskCreation(TaskDraft),
    TaskEdit { task_id: TaskId, field: TaskField },
    ProjectRename { project_id: ProjectId },
    ProjectDescription { project_id: ProjectId },
}

impl Flow {
    /// Short description used when a flow is abandoned.
    pub fn describe(&self) -> &'static str {
        match self {
            Flow::TaskCreation(_) => "task creation",
            Flow::TaskEdit { .. } => "task editing",
            Flow::ProjectRename { .. } => "project renaming",
            Flow::ProjectDescription { .. } => "project description editing",
        }
    }
}

/// Keyed storage of active flows.
pub trait SessionStore: Send + Sync {
    fn get(&self, user: PlatformUserId) -> Option<Flow>;

    /// Stores a flow, returning the one it replaced.
    fn set(&self, user: PlatformUserId, flow: Flow) -> Option<Flow>;

    /// Removes the user's flow, returning it.
    fn clear(&self, user: PlatformUserId) -> Option<Flow>;
}

/// Mutex-guarded in-memory session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<PlatformUserId, Flow>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with an active flow.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PlatformUserId, Flow>> {
        // Each critical section is a single map call, so a poisoned map is still consistent.
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, user: PlatformUserId) -> Option<Flow> {
        self.lock().get(&user).cloned()
    }

    fn set(&self, user: PlatformUserId, flow: Flow) -> Option<Flow> {
        self.lock().insert(user, flow)
    }

    fn clear(&self, user: PlatformUserId) -> Option<Flow> {
        self.lock().remove(&user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_clear() {
        let store = MemorySessionStore::new();
        let user = PlatformUserId(1);
        let flow = Flow::ProjectRename {
            project_id: ProjectId(3),
        };

        assert!(store.get(user).is_none());
        assert!(store.set(user, flow.clone()).is_none());
        assert_eq!(store.get(user), Some(flow.clone()));
        assert_eq!(store.clear(user), Some(flow));
        assert!(store.is_empty());
    }

    #[test]
    fn test_one_flow_per_user() {
        let store = MemorySessionStore::new();
        let user = PlatformUserId(1);

        store.set(
            user,
            Flow::TaskCreation(TaskDraft::new(ProjectId(1), UserId(1))),
        );
        let replaced = store.set(
            user,
            Flow::TaskEdit {
                task_id: TaskId(5),
                field: TaskField::Title,
            },
        );

        assert!(matches!(replaced, Some(Flow::TaskCreation(_))));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_users_are_independent() {
        let store = MemorySessionStore::new();
        store.set(
            PlatformUserId(1),
            Flow::ProjectRename {
                project_id: ProjectId(1),
            },
        );

        assert!(store.get(PlatformUserId(2)).is_none());
        assert!(store.clear(PlatformUserId(2)).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_concurrent_access() {
        let store = std::sync::Arc::new(MemorySessionStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let user = PlatformUserId(i);
                    store.set(
                        user,
                        Flow::ProjectDescription {
                            project_id: ProjectId(i),
                        },
                    );
                    assert!(store.get(user).is_some());
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 8);
    }
}
