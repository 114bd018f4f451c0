//! Role checks for privileged operations.

use taskbot_models::{PlatformUserId, ProjectId, Role};
use taskbot_persistence::UserRepository;

use crate::error::Result;

/// Whether the platform user manages the project.
///
/// Unknown users and non-members are simply not managers. Storage failures
/// are returned as errors.
pub async fn is_manager<U>(store: &U, project_id: ProjectId, platform_id: PlatformUserId) -> Result<bool>
where
    U: UserRepository + ?Sized,
{
    let user = match store.fetch_user_by_platform_id(platform_id).await {
        Ok(user) => user,
        Err(e) if e.is_not_found() => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    match store.fetch_role(project_id, user.id).await {
        Ok(Role::Manager) => Ok(true),
        Ok(Role::Member) => Ok(false),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e.into()),
    }
}
