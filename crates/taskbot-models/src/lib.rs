//! Core data models for Taskbot.
//!
//! This crate provides the entity types shared by the store, the
//! conversation core and the chat transport: projects, users and their
//! roles, tasks, and task query filters.

pub mod filter;
pub mod ids;
pub mod project;
pub mod task;
pub mod user;

// Re-export main types
pub use filter::TaskFilter;
pub use ids::{ChatId, PlatformUserId, ProjectId, TaskId, UserId};
pub use project::Project;
pub use task::{Task, TaskField, TaskStatus};
pub use user::{Membership, Role, User};
