//! Persistence layer for Taskbot.
//!
//! This crate defines the repository traits the conversation core consumes
//! and a table-backed [`MemoryStore`] that can optionally keep a crash-safe
//! JSON snapshot on disk (write to temp file, then rename).
//!
//! # Example
//!
//! ```no_run
//! use taskbot_models::{ChatId, Project};
//! use taskbot_persistence::{MemoryStore, ProjectRepository};
//!
//! # async fn run() -> taskbot_persistence::Result<()> {
//! let store = MemoryStore::open("/home/user/.taskbot/taskbot.json").await?;
//!
//! let project = store.create_project(Project::new(ChatId(-100), "Backend")).await?;
//! let loaded = store.fetch_project_by_chat(ChatId(-100)).await?;
//! assert_eq!(project.id, loaded.id);
//! # Ok(())
//! # }
//! ```

pub mod atomic;
pub mod error;
pub mod memory;
pub mod repository;
mod tables;

pub use error::{PersistenceError, Result};
pub use memory::MemoryStore;
pub use repository::{ProjectRepository, Store, TaskRepository, UserRepository};
