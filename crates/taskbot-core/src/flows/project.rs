//! Manager-only project administration.
//!
//! Every entry point re-checks the caller's role against the store; a
//! button rendered for a manager may be pressed after a demotion or by
//! someone else in a group chat.

use tracing::{error, info};

use taskbot_models::{Project, ProjectId, Role, UserId};
use taskbot_persistence::{ProjectRepository, UserRepository};

use crate::assignee::SKIP;
use crate::auth::is_manager;
use crate::error::Result;
use crate::flows::{FlowContext, Outcome, SessionUpdate, NO_PROJECT};
use crate::intent::CallbackAction;
use crate::reply::{Button, Keyboard};
use crate::session::Flow;
use crate::views::{self, html_escape};

fn denied(ctx: &FlowContext<'_>, action: &str, session: SessionUpdate) -> Outcome {
    Outcome::new(session).reply(ctx.text(format!("❌ You don't have permission to {}.", action)))
}

/// Resolves the chat's project and checks that the sender manages it.
///
/// `Err` carries the reply to send instead.
async fn managed_project(
    ctx: &FlowContext<'_>,
    action: &str,
) -> Result<std::result::Result<Project, Outcome>> {
    let project = match ctx.store.fetch_project_by_chat(ctx.chat_id()).await {
        Ok(project) => project,
        Err(e) if e.is_not_found() => return Ok(Err(Outcome::keep().reply(ctx.text(NO_PROJECT)))),
        Err(e) => return Err(e.into()),
    };
    if !is_manager(ctx.store, project.id, ctx.sender().platform_id).await? {
        return Ok(Err(denied(ctx, action, SessionUpdate::Keep)));
    }
    Ok(Ok(project))
}

/// Re-validates a text step of a running flow.
async fn flow_project(
    ctx: &FlowContext<'_>,
    project_id: ProjectId,
    action: &str,
) -> Result<std::result::Result<Project, Outcome>> {
    let project = match ctx.store.fetch_project(project_id).await {
        Ok(project) => project,
        Err(e) if e.is_not_found() => {
            return Ok(Err(Outcome::clear().reply(ctx.text("❌ The project no longer exists."))))
        }
        Err(e) => return Err(e.into()),
    };
    if !is_manager(ctx.store, project.id, ctx.sender().platform_id).await? {
        return Ok(Err(denied(ctx, action, SessionUpdate::Clear)));
    }
    Ok(Ok(project))
}

fn cancel_keyboard() -> Keyboard {
    Keyboard::new().row(vec![Button::new("❌ Cancel", CallbackAction::CancelFlow)])
}

async fn persist(ctx: &FlowContext<'_>, project: &Project, notice: String) -> Result<Outcome> {
    if let Err(e) = ctx.store.update_project(project).await {
        error!(project_id = %project.id, error = %e, "Failed to update project");
        return Ok(Outcome::clear().reply(ctx.text("❌ Could not update the project.")));
    }
    Ok(Outcome::clear()
        .reply(ctx.text(notice))
        .reply(ctx.view(views::management_menu(project))))
}

/// Management menu.
pub async fn show_management(ctx: &FlowContext<'_>) -> Result<Outcome> {
    match managed_project(ctx, "manage this project").await? {
        Ok(project) => Ok(Outcome::keep().reply(ctx.view(views::management_menu(&project)))),
        Err(outcome) => Ok(outcome),
    }
}

pub async fn start_rename(ctx: &FlowContext<'_>) -> Result<Outcome> {
    let project = match managed_project(ctx, "rename this project").await? {
        Ok(project) => project,
        Err(outcome) => return Ok(outcome),
    };
    Ok(Outcome::start(Flow::ProjectRename {
        project_id: project.id,
    })
    .reply(ctx.view((
        format!(
            "✏️ <b>Rename project</b>\n\nCurrent name: {}\n\nSend the new name:",
            html_escape(&project.title)
        ),
        cancel_keyboard(),
    ))))
}

pub async fn handle_rename_text(
    ctx: &FlowContext<'_>,
    project_id: ProjectId,
    text: &str,
) -> Result<Outcome> {
    let mut project = match flow_project(ctx, project_id, "rename this project").await? {
        Ok(project) => project,
        Err(outcome) => return Ok(outcome),
    };

    let title = text.trim();
    if title.is_empty() {
        return Ok(Outcome::keep().reply(ctx.text("❌ The name can't be empty. Send the new name:")));
    }

    let before = std::mem::replace(&mut project.title, title.to_string());
    info!(project_id = %project.id, "Renaming project");
    let notice = format!(
        "✅ Project renamed: {} → {}",
        html_escape(&before),
        html_escape(&project.title)
    );
    persist(ctx, &project, notice).await
}

pub async fn start_description(ctx: &FlowContext<'_>) -> Result<Outcome> {
    let project = match managed_project(ctx, "edit the project description").await? {
        Ok(project) => project,
        Err(outcome) => return Ok(outcome),
    };
    Ok(Outcome::start(Flow::ProjectDescription {
        project_id: project.id,
    })
    .reply(ctx.view((
        format!(
            "📝 <b>Project description</b>\n\nCurrent description: {}\n\n\
             Send the new description, or '-' to remove it:",
            project
                .description()
                .map(html_escape)
                .unwrap_or_else(|| "<i>not set</i>".to_string())
        ),
        cancel_keyboard(),
    ))))
}

pub async fn handle_description_text(
    ctx: &FlowContext<'_>,
    project_id: ProjectId,
    text: &str,
) -> Result<Outcome> {
    let mut project = match flow_project(ctx, project_id, "edit the project description").await? {
        Ok(project) => project,
        Err(outcome) => return Ok(outcome),
    };

    let text = text.trim();
    if text.is_empty() {
        return Ok(Outcome::keep().reply(
            ctx.text("❌ The description can't be empty. Send it again, or '-' to remove it:"),
        ));
    }

    let notice = if text == SKIP {
        project.description.clear();
        "✅ Project description removed.".to_string()
    } else {
        project.description = text.to_string();
        "✅ Project description updated.".to_string()
    };
    info!(project_id = %project.id, "Updating project description");
    persist(ctx, &project, notice).await
}

/// Members that can be promoted.
pub async fn show_promotions(ctx: &FlowContext<'_>) -> Result<Outcome> {
    let project = match managed_project(ctx, "assign managers").await? {
        Ok(project) => project,
        Err(outcome) => return Ok(outcome),
    };
    let members = ctx.store.list_members(project.id).await?;
    Ok(Outcome::keep().reply(ctx.view(views::promotion_list(&members))))
}

/// Promotes a member after re-validating the target.
pub async fn promote(ctx: &FlowContext<'_>, user_id: UserId) -> Result<Outcome> {
    let project = match managed_project(ctx, "assign managers").await? {
        Ok(project) => project,
        Err(outcome) => return Ok(outcome),
    };

    let user = match ctx.store.fetch_user(user_id).await {
        Ok(user) => user,
        Err(e) if e.is_not_found() => return Ok(Outcome::keep().reply(ctx.text("❌ User not found."))),
        Err(e) => return Err(e.into()),
    };
    let name = html_escape(&user.display_name());

    match ctx.store.fetch_role(project.id, user.id).await {
        Ok(Role::Manager) => {
            return Ok(Outcome::keep().reply(ctx.text(format!("ℹ️ {} is already a manager.", name))))
        }
        Ok(Role::Member) => {}
        Err(e) if e.is_not_found() => {
            return Ok(Outcome::keep().reply(
                ctx.text(format!("❌ {} is not a member of this project.", name)),
            ))
        }
        Err(e) => return Err(e.into()),
    }

    if let Err(e) = ctx.store.update_role(project.id, user.id, Role::Manager).await {
        error!(project_id = %project.id, user_id = %user.id, error = %e, "Failed to promote member");
        return Ok(Outcome::keep().reply(ctx.text("❌ Could not assign the manager.")));
    }
    info!(project_id = %project.id, user_id = %user.id, "Promoted member to manager");

    Ok(Outcome::keep()
        .reply(ctx.text(format!("✅ {} is now a manager.", name)))
        .reply(ctx.view(views::management_menu(&project))))
}

pub async fn confirm_delete(ctx: &FlowContext<'_>) -> Result<Outcome> {
    match managed_project(ctx, "delete this project").await? {
        Ok(project) => Ok(Outcome::keep().reply(ctx.view(views::delete_confirmation(&project)))),
        Err(outcome) => Ok(outcome),
    }
}

/// Deletes the project with its memberships and tasks.
pub async fn delete(ctx: &FlowContext<'_>) -> Result<Outcome> {
    let project = match managed_project(ctx, "delete this project").await? {
        Ok(project) => project,
        Err(outcome) => return Ok(outcome),
    };

    if let Err(e) = ctx.store.delete_project(project.id).await {
        error!(project_id = %project.id, error = %e, "Failed to delete project");
        return Ok(Outcome::clear().reply(ctx.text("❌ Could not delete the project.")));
    }
    info!(project_id = %project.id, chat_id = %project.chat_id, "Deleted project");

    Ok(Outcome::clear().reply(ctx.text(format!(
        "🗑 Project \"{}\" deleted.\n\nUse /start to create a new one.",
        html_escape(&project.title)
    ))))
}

pub async fn toggle_archive(ctx: &FlowContext<'_>) -> Result<Outcome> {
    let mut project = match managed_project(ctx, "archive this project").await? {
        Ok(project) => project,
        Err(outcome) => return Ok(outcome),
    };
    project.is_archived = !project.is_archived;
    let notice = if project.is_archived {
        "🗄 Project archived. New tasks can't be created until it is unarchived."
    } else {
        "📤 Project unarchived."
    };
    let outcome = persist(ctx, &project, notice.to_string()).await?;
    Ok(Outcome {
        session: SessionUpdate::Keep,
        ..outcome
    })
}

pub async fn toggle_hide_completed(ctx: &FlowContext<'_>) -> Result<Outcome> {
    let mut project = match managed_project(ctx, "change project settings").await? {
        Ok(project) => project,
        Err(outcome) => return Ok(outcome),
    };
    project.hide_completed = !project.hide_completed;
    let notice = if project.hide_completed {
        "🙈 Completed tasks are now hidden from listings."
    } else {
        "👁 Recently completed tasks are shown again."
    };
    let outcome = persist(ctx, &project, notice.to_string()).await?;
    Ok(Outcome {
        session: SessionUpdate::Keep,
        ..outcome
    })
}
