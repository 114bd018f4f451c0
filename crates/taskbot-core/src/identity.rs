//! Get-or-create resolution of chats and senders into stored entities.
//!
//! All three operations are idempotent: calling them again with the same
//! input returns the same entities without further writes.

use tracing::{debug, info, warn};

use taskbot_models::{ChatId, Project, ProjectId, Role, User, UserId};
use taskbot_persistence::{ProjectRepository, UserRepository};

use crate::error::Result;
use crate::event::Sender;

/// Returns the chat's project, creating it on first contact.
///
/// The flag is true when the project was created by this call.
pub async fn ensure_project<P>(store: &P, chat_id: ChatId, title: &str) -> Result<(Project, bool)>
where
    P: ProjectRepository + ?Sized,
{
    match store.fetch_project_by_chat(chat_id).await {
        Ok(project) => {
            debug!(project_id = %project.id, chat_id = %chat_id, "Project exists");
            Ok((project, false))
        }
        Err(e) if e.is_not_found() => {
            let project = store.create_project(Project::new(chat_id, title)).await?;
            info!(project_id = %project.id, chat_id = %chat_id, title = %project.title, "Created project");
            Ok((project, true))
        }
        Err(e) => Err(e.into()),
    }
}

/// Returns the stored user for a sender, creating it on first contact.
///
/// A changed handle is written back on a best-effort basis: a failed update
/// is logged and the stored user is returned as fetched.
pub async fn ensure_user<U>(store: &U, sender: &Sender) -> Result<User>
where
    U: UserRepository + ?Sized,
{
    match store.fetch_user_by_platform_id(sender.platform_id).await {
        Ok(mut user) => {
            if user.username != sender.username {
                let mut updated = user.clone();
                updated.username = sender.username.clone();
                match store.update_user(&updated).await {
                    Ok(()) => {
                        debug!(user_id = %user.id, "Updated username");
                        user = updated;
                    }
                    Err(e) => {
                        warn!(user_id = %user.id, error = %e, "Could not update username");
                    }
                }
            }
            Ok(user)
        }
        Err(e) if e.is_not_found() => {
            let user = User::new(sender.platform_id)
                .with_full_name(sender.full_name.clone())
                .with_username(sender.username.clone());
            let user = store.create_user(user).await?;
            info!(user_id = %user.id, platform_id = %sender.platform_id, "Created user");
            Ok(user)
        }
        Err(e) => Err(e.into()),
    }
}

/// Returns the user's role in the project, enrolling them if needed.
///
/// The first member of a project becomes its Manager; everyone after is a
/// Member. The count and the insert are separate calls, so two users joining
/// an empty project at the same instant could both become Managers.
pub async fn ensure_membership<U>(
    store: &U,
    project_id: ProjectId,
    user_id: UserId,
) -> Result<(Role, bool)>
where
    U: UserRepository + ?Sized,
{
    match store.fetch_role(project_id, user_id).await {
        Ok(role) => Ok((role, false)),
        Err(e) if e.is_not_found() => {
            let role = if store.count_members(project_id).await? == 0 {
                Role::Manager
            } else {
                Role::Member
            };
            store.add_membership(project_id, user_id, role).await?;
            info!(project_id = %project_id, user_id = %user_id, role = %role, "Added project member");
            Ok((role, true))
        }
        Err(e) => Err(e.into()),
    }
}
