//! Users and their per-project roles.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{PlatformUserId, UserId};

/// Role of a user within one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full project administration.
    Manager,
    /// Task-level access only.
    Member,
}

impl Role {
    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Role::Manager => "Manager",
            Role::Member => "Member",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Manager => write!(f, "manager"),
            Role::Member => write!(f, "member"),
        }
    }
}

/// A platform identity. Users are global and shared across projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Identifier assigned by the store.
    pub id: UserId,

    /// Identifier on the messaging platform. Unique across users.
    pub platform_id: PlatformUserId,

    /// Display name as reported by the platform.
    #[serde(default)]
    pub full_name: String,

    /// Handle without the leading `@`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Whether the user is active.
    pub is_active: bool,
}

impl User {
    /// Creates an unsaved, active user.
    pub fn new(platform_id: PlatformUserId) -> Self {
        Self {
            id: UserId::default(),
            platform_id,
            full_name: String::new(),
            username: None,
            is_active: true,
        }
    }

    /// Sets the display name.
    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = full_name.into();
        self
    }

    /// Sets the handle.
    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    /// Name shown in chat: full name, then `@handle`, then the internal id.
    pub fn display_name(&self) -> String {
        if !self.full_name.is_empty() {
            return self.full_name.clone();
        }
        match &self.username {
            Some(username) if !username.is_empty() => format!("@{}", username),
            _ => format!("ID: {}", self.id),
        }
    }
}

/// A user together with their role in some project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub user: User,
    pub role: Role,
}
