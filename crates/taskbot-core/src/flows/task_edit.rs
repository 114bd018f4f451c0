//! Single-field edits started from the task card.

use tracing::{error, info};

use taskbot_models::{Task, TaskField, TaskId, TaskStatus, UserId};
use taskbot_persistence::{ProjectRepository, TaskRepository, UserRepository};

use crate::assignee::{parse_assignee, resolve_mention, AssigneeError, AssigneeInput, SKIP};
use crate::dates::{format_deadline, parse_deadline, DateError};
use crate::error::Result;
use crate::flows::{FlowContext, Outcome, SessionUpdate};
use crate::identity::ensure_user;
use crate::reply::Keyboard;
use crate::session::Flow;
use crate::views::{self, html_escape};

const NOT_FOUND: &str = "❌ Task not found.";

/// Loads a task if it belongs to the current chat's project.
pub async fn load_task(ctx: &FlowContext<'_>, task_id: TaskId) -> Result<Option<Task>> {
    let task = match ctx.store.fetch_task(task_id).await {
        Ok(task) => task,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let project = match ctx.store.fetch_project_by_chat(ctx.chat_id()).await {
        Ok(project) => project,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok((task.project_id == project.id).then_some(task))
}

/// Task card.
pub async fn show(ctx: &FlowContext<'_>, task_id: TaskId) -> Result<Outcome> {
    match load_task(ctx, task_id).await? {
        Some(task) => Ok(Outcome::keep().reply(ctx.task_detail(&task).await?)),
        None => Ok(Outcome::keep().reply(ctx.text(NOT_FOUND))),
    }
}

/// Opens the edit prompt for one field.
pub async fn start(ctx: &FlowContext<'_>, task_id: TaskId, field: TaskField) -> Result<Outcome> {
    let Some(task) = load_task(ctx, task_id).await? else {
        return Ok(Outcome::keep().reply(ctx.text(NOT_FOUND)));
    };
    let assignee = match task.assignee {
        Some(id) => Some(ctx.user_name(id).await),
        None => None,
    };
    let prompt = views::field_prompt(&task, field, assignee.as_deref(), ctx.clock.today());
    Ok(Outcome::start(Flow::TaskEdit { task_id, field }).reply(ctx.view(prompt)))
}

/// Applies a text answer to the field being edited.
pub async fn handle_text(
    ctx: &FlowContext<'_>,
    task_id: TaskId,
    field: TaskField,
    text: &str,
) -> Result<Outcome> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Outcome::keep().reply(ctx.text("❌ The value can't be empty. Try again:")));
    }

    let Some(mut task) = load_task(ctx, task_id).await? else {
        return Ok(Outcome::clear().reply(ctx.text(NOT_FOUND)));
    };
    let before = value_label(ctx, &task, field).await;

    match field {
        TaskField::Title => task.title = text.to_string(),
        TaskField::Description => task.description = text.to_string(),
        TaskField::Status => {
            return Ok(Outcome::clear().reply(ctx.view((
                "❌ Status is changed with the buttons below.".to_string(),
                views::status_choices(&task),
            ))));
        }
        TaskField::Deadline => match parse_deadline(text, ctx.clock.today()) {
            Ok(deadline) => task.deadline = Some(deadline),
            Err(e) => return Ok(reject_deadline(ctx, &task, e)),
        },
        TaskField::Assignee => match assignee_from_text(ctx, &task, text).await? {
            Ok(assignee) => task.assignee = assignee,
            Err(e) => {
                return Ok(Outcome::keep().reply(ctx.text(format!(
                    "❌ {} Try again:",
                    html_escape(&e.to_string())
                ))));
            }
        },
    }

    save(ctx, task, field, before, SessionUpdate::Clear).await
}

/// Empties a clearable field straight from a button.
pub async fn clear_field(ctx: &FlowContext<'_>, task_id: TaskId, field: TaskField) -> Result<Outcome> {
    if !field.is_clearable() {
        return Ok(Outcome::keep());
    }
    let Some(mut task) = load_task(ctx, task_id).await? else {
        return Ok(Outcome::new(SessionUpdate::EndEdit(task_id)).reply(ctx.text(NOT_FOUND)));
    };
    let before = value_label(ctx, &task, field).await;

    match field {
        TaskField::Description => task.description.clear(),
        TaskField::Deadline => task.deadline = None,
        TaskField::Assignee => task.assignee = None,
        TaskField::Title | TaskField::Status => return Ok(Outcome::keep()),
    }

    save(ctx, task, field, before, SessionUpdate::EndEdit(task_id)).await
}

/// Sets the status from a status button.
pub async fn set_status(ctx: &FlowContext<'_>, task_id: TaskId, status: TaskStatus) -> Result<Outcome> {
    let Some(mut task) = load_task(ctx, task_id).await? else {
        return Ok(Outcome::new(SessionUpdate::EndEdit(task_id)).reply(ctx.text(NOT_FOUND)));
    };
    let before = value_label(ctx, &task, TaskField::Status).await;
    task.status = status;
    save(ctx, task, TaskField::Status, before, SessionUpdate::EndEdit(task_id)).await
}

async fn assignee_from_text(
    ctx: &FlowContext<'_>,
    task: &Task,
    text: &str,
) -> Result<std::result::Result<Option<UserId>, AssigneeError>> {
    match parse_assignee(text) {
        AssigneeInput::Skip => Ok(Ok(None)),
        AssigneeInput::Myself => {
            let user = ensure_user(ctx.store, ctx.sender()).await?;
            match ctx.store.fetch_role(task.project_id, user.id).await {
                Ok(_) => Ok(Ok(Some(user.id))),
                Err(e) if e.is_not_found() => Ok(Err(AssigneeError::SelfNotMember)),
                Err(e) => Err(e.into()),
            }
        }
        AssigneeInput::Mention(handle) => {
            let resolved = resolve_mention(ctx.store, ctx.config, task.project_id, &handle).await?;
            Ok(resolved.map(|user| Some(user.id)))
        }
        AssigneeInput::Invalid => Ok(Err(AssigneeError::InvalidFormat)),
    }
}

fn reject_deadline(ctx: &FlowContext<'_>, task: &Task, e: DateError) -> Outcome {
    let text = match e {
        DateError::InvalidFormat => "❌ Invalid date format. Use DD.MM.YYYY (for example 25.12.2025):",
        DateError::InPast => "❌ The deadline can't be in the past. Pick a future date:",
    };
    let today = ctx.clock.today();
    let keyboard: Keyboard = views::calendar(
        today,
        today,
        views::CalendarMode::Edit(task.id, task.deadline.is_some()),
    );
    Outcome::keep().reply(ctx.view((text.to_string(), keyboard)))
}

async fn value_label(ctx: &FlowContext<'_>, task: &Task, field: TaskField) -> String {
    match field {
        TaskField::Title => html_escape(&task.title),
        TaskField::Description => task
            .description()
            .map(html_escape)
            .unwrap_or_else(|| "<i>none</i>".to_string()),
        TaskField::Status => format!("{} {}", task.status.emoji(), task.status.label()),
        TaskField::Deadline => task
            .deadline
            .map(format_deadline)
            .unwrap_or_else(|| "<i>not set</i>".to_string()),
        TaskField::Assignee => match task.assignee {
            Some(id) => html_escape(&ctx.user_name(id).await),
            None => "<i>Unassigned</i>".to_string(),
        },
    }
}

async fn save(
    ctx: &FlowContext<'_>,
    mut task: Task,
    field: TaskField,
    before: String,
    session: SessionUpdate,
) -> Result<Outcome> {
    let editor = ensure_user(ctx.store, ctx.sender()).await?;
    task.touch(editor.id, ctx.clock.now());

    if let Err(e) = ctx.store.update_task(&task).await {
        error!(task_id = %task.id, field = %field, error = %e, "Failed to update task");
        return Ok(Outcome::new(session).reply(ctx.text("❌ Could not update the task.")));
    }
    info!(task_id = %task.id, field = %field, user_id = %editor.id, "Updated task");

    let after = value_label(ctx, &task, field).await;
    Ok(Outcome::new(session)
        .reply(ctx.text(format!(
            "✅ <b>{}</b> updated: {} → {}",
            field.label(),
            before,
            after
        )))
        .reply(ctx.task_detail(&task).await?))
}
