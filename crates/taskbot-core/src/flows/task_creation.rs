//! Four-step task creation: title, description, assignee, deadline.

use tracing::{error, info};

use taskbot_models::{Project, Task, User};
use taskbot_persistence::{ProjectRepository, TaskRepository};

use crate::assignee::{parse_assignee, resolve_mention, AssigneeError, AssigneeInput, SKIP};
use crate::dates::{format_deadline, parse_deadline, DateError};
use crate::error::Result;
use crate::flows::{FlowContext, Outcome};
use crate::intent::CallbackAction;
use crate::reply::{Button, Keyboard, Reply};
use crate::session::{Flow, TaskCreationStep, TaskDraft};
use crate::views::{self, html_escape, CalendarMode};

fn step_buttons(skippable: bool) -> Keyboard {
    let mut row = Vec::new();
    if skippable {
        row.push(Button::new("⏭ Skip", CallbackAction::SkipStep));
    }
    row.push(Button::new("❌ Cancel", CallbackAction::CancelFlow));
    Keyboard::new().row(row)
}

/// Prompt for a step.
pub fn prompt(ctx: &FlowContext<'_>, step: TaskCreationStep) -> Reply {
    match step {
        TaskCreationStep::Title => Reply::with_keyboard(
            ctx.chat_id(),
            "📝 <b>New task</b>\n\nStep 1/4: Send the task title:",
            step_buttons(false),
        ),
        TaskCreationStep::Description => Reply::with_keyboard(
            ctx.chat_id(),
            "📄 Step 2/4: Send the task description, or '-' to skip:",
            step_buttons(true),
        ),
        TaskCreationStep::Assignee => Reply::with_keyboard(
            ctx.chat_id(),
            "👤 Step 3/4: Who should do it?\n\n\
             • @username to assign a project member\n\
             • 'me' to take it yourself\n\
             • '-' to leave it unassigned",
            step_buttons(true),
        ),
        TaskCreationStep::Deadline => Reply::with_keyboard(
            ctx.chat_id(),
            "⏰ Step 4/4: Set a deadline.\n\nPick a day below, or:\n\
             • send a date as DD.MM.YYYY (for example 25.12.2025)\n\
             • send '-' to skip",
            views::calendar(ctx.clock.today(), ctx.clock.today(), CalendarMode::Creation),
        ),
    }
}

/// Begins task creation in `project` on behalf of `creator`.
pub fn start(ctx: &FlowContext<'_>, project: &Project, creator: &User) -> Outcome {
    let draft = TaskDraft::new(project.id, creator.id);
    Outcome::start(Flow::TaskCreation(draft)).reply(prompt(ctx, TaskCreationStep::Title))
}

/// Handles the Skip button.
pub async fn skip(ctx: &FlowContext<'_>, draft: TaskDraft) -> Result<Outcome> {
    if draft.step == TaskCreationStep::Title {
        return Ok(Outcome::keep().reply(ctx.text("❌ The title can't be skipped. Send the task title:")));
    }
    handle_text(ctx, draft, SKIP).await
}

/// Consumes one text turn.
pub async fn handle_text(ctx: &FlowContext<'_>, mut draft: TaskDraft, text: &str) -> Result<Outcome> {
    let text = text.trim();

    match draft.step {
        TaskCreationStep::Title => {
            if text.is_empty() {
                return Ok(Outcome::keep()
                    .reply(ctx.text("❌ The task title can't be empty. Try again:")));
            }
            draft.title = text.to_string();
            draft.step = TaskCreationStep::Description;
            Ok(Outcome::set(Flow::TaskCreation(draft)).reply(prompt(ctx, TaskCreationStep::Description)))
        }
        TaskCreationStep::Description => {
            draft.description = if text == SKIP {
                String::new()
            } else {
                text.to_string()
            };
            draft.step = TaskCreationStep::Assignee;
            Ok(Outcome::set(Flow::TaskCreation(draft)).reply(prompt(ctx, TaskCreationStep::Assignee)))
        }
        TaskCreationStep::Assignee => {
            let assignee = match parse_assignee(text) {
                AssigneeInput::Skip => None,
                AssigneeInput::Myself => Some(draft.created_by),
                AssigneeInput::Mention(handle) => {
                    match resolve_mention(ctx.store, ctx.config, draft.project_id, &handle).await? {
                        Ok(user) => Some(user.id),
                        Err(e) => return Ok(reject_assignee(ctx, e)),
                    }
                }
                AssigneeInput::Invalid => return Ok(reject_assignee(ctx, AssigneeError::InvalidFormat)),
            };
            draft.assignee = assignee;
            draft.step = TaskCreationStep::Deadline;
            Ok(Outcome::set(Flow::TaskCreation(draft)).reply(prompt(ctx, TaskCreationStep::Deadline)))
        }
        TaskCreationStep::Deadline => {
            let deadline = if text == SKIP {
                None
            } else {
                match parse_deadline(text, ctx.clock.today()) {
                    Ok(deadline) => Some(deadline),
                    Err(e) => return Ok(reject_deadline(ctx, e)),
                }
            };
            finalize(ctx, draft, deadline).await
        }
    }
}

fn reject_assignee(ctx: &FlowContext<'_>, e: AssigneeError) -> Outcome {
    Outcome::keep().reply(Reply::with_keyboard(
        ctx.chat_id(),
        format!("❌ {} Choose another assignee:", html_escape(&e.to_string())),
        step_buttons(true),
    ))
}

fn reject_deadline(ctx: &FlowContext<'_>, e: DateError) -> Outcome {
    let text = match e {
        DateError::InvalidFormat => "❌ Invalid date format. Use DD.MM.YYYY (for example 25.12.2025):",
        DateError::InPast => "❌ The deadline can't be in the past. Pick a future date:",
    };
    let today = ctx.clock.today();
    Outcome::keep().reply(Reply::with_keyboard(
        ctx.chat_id(),
        text,
        views::calendar(today, today, CalendarMode::Creation),
    ))
}

async fn finalize(
    ctx: &FlowContext<'_>,
    draft: TaskDraft,
    deadline: Option<chrono::NaiveDateTime>,
) -> Result<Outcome> {
    let mut task = Task::new(draft.project_id, draft.title, draft.created_by);
    task.description = draft.description;
    task.assignee = draft.assignee;
    task.deadline = deadline;
    let now = ctx.clock.now();
    task.created_at = now;
    task.updated_at = now;

    let task = match ctx.store.create_task(task).await {
        Ok(task) => task,
        Err(e) => {
            error!(project_id = %draft.project_id, error = %e, "Failed to create task");
            return Ok(Outcome::clear().reply(ctx.text("❌ Could not create the task. Please try again.")));
        }
    };
    info!(task_id = %task.id, project_id = %task.project_id, "Created task");

    let assignee = match task.assignee {
        Some(id) => ctx.user_name(id).await,
        None => "not assigned".to_string(),
    };
    let summary = format!(
        "✅ <b>Task created</b>\n\n<b>#{} {}</b>\n<b>Description:</b> {}\n<b>Assignee:</b> {}\n<b>Deadline:</b> {}",
        task.id,
        html_escape(&task.title),
        task.description()
            .map(html_escape)
            .unwrap_or_else(|| "none".to_string()),
        html_escape(&assignee),
        task.deadline
            .map(format_deadline)
            .unwrap_or_else(|| "not set".to_string()),
    );

    let mut outcome = Outcome::clear().reply(ctx.text(summary));
    match ctx.store.fetch_project(task.project_id).await {
        Ok(project) => outcome = outcome.reply(ctx.main_menu(&project).await?),
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e.into()),
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, FixedClock};
    use crate::config::BotConfig;
    use crate::event::{Chat, Event, Sender};
    use crate::flows::SessionUpdate;
    use chrono::{Duration, Utc};
    use taskbot_models::{ChatId, PlatformUserId, ProjectId, Role, TaskFilter};
    use taskbot_persistence::{MemoryStore, UserRepository};

    struct Fixture {
        store: MemoryStore,
        config: BotConfig,
        clock: FixedClock,
        event: Event,
        project: Project,
        creator: User,
    }

    impl Fixture {
        async fn new() -> Self {
            let store = MemoryStore::new();
            let project = store
                .create_project(Project::new(ChatId(-1), "P"))
                .await
                .unwrap();
            let creator = store
                .create_user(User::new(PlatformUserId(10)).with_username(Some("ada".to_string())))
                .await
                .unwrap();
            store
                .add_membership(project.id, creator.id, Role::Manager)
                .await
                .unwrap();
            let event = Event::text(
                Chat {
                    id: ChatId(-1),
                    title: Some("P".to_string()),
                    is_private: false,
                },
                Sender {
                    platform_id: PlatformUserId(10),
                    full_name: "Ada".to_string(),
                    username: Some("ada".to_string()),
                },
                "",
            );
            Self {
                store,
                config: BotConfig::new("taskbot"),
                clock: FixedClock(Utc::now()),
                event,
                project,
                creator,
            }
        }

        fn ctx(&self) -> FlowContext<'_> {
            FlowContext {
                store: &self.store,
                config: &self.config,
                clock: &self.clock,
                event: &self.event,
            }
        }

        fn draft(&self, step: TaskCreationStep) -> TaskDraft {
            let mut draft = TaskDraft::new(self.project.id, self.creator.id);
            draft.title = "Fix bug".to_string();
            draft.step = step;
            draft
        }
    }

    fn next_draft(outcome: &Outcome) -> &TaskDraft {
        match &outcome.session {
            SessionUpdate::Set(Flow::TaskCreation(draft)) => draft,
            other => panic!("unexpected session update: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_title_reprompts() {
        let f = Fixture::new().await;
        let draft = TaskDraft::new(f.project.id, f.creator.id);

        let outcome = handle_text(&f.ctx(), draft, "   ").await.unwrap();
        assert_eq!(outcome.session, SessionUpdate::Keep);
    }

    #[tokio::test]
    async fn test_title_cannot_be_skipped() {
        let f = Fixture::new().await;
        let draft = TaskDraft::new(f.project.id, f.creator.id);

        let outcome = skip(&f.ctx(), draft).await.unwrap();
        assert_eq!(outcome.session, SessionUpdate::Keep);
    }

    #[tokio::test]
    async fn test_self_assignment() {
        let f = Fixture::new().await;

        let outcome = handle_text(&f.ctx(), f.draft(TaskCreationStep::Assignee), "Я")
            .await
            .unwrap();
        let draft = next_draft(&outcome);
        assert_eq!(draft.step, TaskCreationStep::Deadline);
        assert_eq!(draft.assignee, Some(f.creator.id));
    }

    #[tokio::test]
    async fn test_bot_cannot_be_assignee() {
        let f = Fixture::new().await;

        let outcome = handle_text(&f.ctx(), f.draft(TaskCreationStep::Assignee), "@TaskBot")
            .await
            .unwrap();
        assert_eq!(outcome.session, SessionUpdate::Keep);
        assert!(outcome.replies[0].message_text().unwrap().contains("bot"));
    }

    #[tokio::test]
    async fn test_deadline_in_past_reprompts() {
        let f = Fixture::new().await;
        let yesterday = f.clock.today() - Duration::days(1);

        let outcome = handle_text(
            &f.ctx(),
            f.draft(TaskCreationStep::Deadline),
            &crate::dates::format_date(yesterday),
        )
        .await
        .unwrap();
        assert_eq!(outcome.session, SessionUpdate::Keep);
        assert!(f
            .store
            .filter_tasks(&TaskFilter::new())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_finalize_persists_task() {
        let f = Fixture::new().await;
        let mut draft = f.draft(TaskCreationStep::Deadline);
        draft.description = "Details".to_string();
        draft.assignee = Some(f.creator.id);

        let outcome = handle_text(&f.ctx(), draft, "-").await.unwrap();
        assert_eq!(outcome.session, SessionUpdate::Clear);

        let tasks = f.store.filter_tasks(&TaskFilter::new()).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].description, "Details");
        assert_eq!(tasks[0].assignee, Some(f.creator.id));
        assert_eq!(tasks[0].created_at, f.clock.now());
        // Summary plus main menu.
        assert_eq!(outcome.replies.len(), 2);
    }

    #[tokio::test]
    async fn test_finalize_failure_clears_session() {
        let f = Fixture::new().await;
        let mut draft = f.draft(TaskCreationStep::Deadline);
        draft.project_id = ProjectId(999);

        let outcome = handle_text(&f.ctx(), draft, "-").await.unwrap();
        assert_eq!(outcome.session, SessionUpdate::Clear);
        assert!(outcome.replies[0]
            .message_text()
            .unwrap()
            .contains("Could not create"));
    }
}
