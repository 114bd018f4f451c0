//! Event routing.
//!
//! Precedence, highest first: callback buttons, text for an active flow
//! (where cancel words always win), slash-commands, everything else.
//!
//! Events of one user are handled one at a time, even across chats: a
//! per-user turn lock is held from reading the session until the update
//! is applied.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use tokio::sync::Mutex as TurnLock;
use tracing::{debug, error, warn};

use taskbot_models::{PlatformUserId, Project, TaskField, TaskFilter, UserId};
use taskbot_persistence::{ProjectRepository, Store, TaskRepository};

use crate::auth::is_manager;
use crate::clock::{Clock, SystemClock};
use crate::config::BotConfig;
use crate::dates::format_date;
use crate::error::Result;
use crate::event::{Event, Payload};
use crate::flows::{project, task_creation, task_edit, FlowContext, Outcome, SessionUpdate, NO_PROJECT};
use crate::identity::{ensure_membership, ensure_project, ensure_user};
use crate::intent::{is_cancel, parse_command, CalendarAction, CallbackAction, Command};
use crate::listing::visible_tasks;
use crate::reply::Reply;
use crate::session::{Flow, MemorySessionStore, SessionStore, TaskCreationStep};
use crate::views::{self, html_escape, CalendarMode, TaskLine};

/// Turns inbound events into replies, one event per user at a time.
pub struct Dispatcher {
    store: Arc<dyn Store>,
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    config: BotConfig,
    turns: Mutex<HashMap<PlatformUserId, Arc<TurnLock<()>>>>,
}

impl Dispatcher {
    /// Creates a dispatcher with in-memory sessions and the system clock.
    pub fn new(store: Arc<dyn Store>, config: BotConfig) -> Self {
        Self {
            store,
            sessions: Arc::new(MemorySessionStore::new()),
            clock: Arc::new(SystemClock),
            config,
            turns: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_sessions(mut self, sessions: Arc<dyn SessionStore>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }

    /// Turn lock serializing the events of one user.
    fn turn(&self, user: PlatformUserId) -> Arc<TurnLock<()>> {
        let mut turns = self.turns.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(turns.entry(user).or_default())
    }

    /// Handles one event. Never fails: errors become a generic reply and
    /// end the sender's session.
    pub async fn handle(&self, event: &Event) -> Vec<Reply> {
        let user = event.sender.platform_id;
        let chat_id = event.chat.id;

        if !self.config.is_allowed(user) {
            warn!(chat_id = %chat_id, platform_id = %user, "Rejected user outside the allow-list");
            return vec![Reply::text(
                chat_id,
                format!("⛔ Access denied. Your id: {}", user),
            )];
        }

        let turn = self.turn(user);
        let _turn = turn.lock().await;

        let ctx = FlowContext {
            store: self.store.as_ref(),
            config: &self.config,
            clock: self.clock.as_ref(),
            event,
        };

        match self.route(&ctx).await {
            Ok(outcome) => self.apply(&ctx, outcome),
            Err(e) => {
                error!(chat_id = %chat_id, platform_id = %user, error = %e, "Failed to handle event");
                self.sessions.clear(user);
                vec![ctx.text("❌ Something went wrong. Please try again.")]
            }
        }
    }

    async fn route(&self, ctx: &FlowContext<'_>) -> Result<Outcome> {
        match &ctx.event.payload {
            Payload::Callback { data, message_id } => match data.parse::<CallbackAction>() {
                Ok(action) => {
                    debug!(chat_id = %ctx.chat_id(), action = %action, "Callback");
                    self.on_callback(ctx, action, *message_id).await
                }
                Err(e) => {
                    debug!(chat_id = %ctx.chat_id(), error = %e, "Ignoring callback");
                    Ok(Outcome::keep())
                }
            },
            Payload::Text(text) => self.on_text(ctx, text).await,
        }
    }

    async fn on_text(&self, ctx: &FlowContext<'_>, text: &str) -> Result<Outcome> {
        let user = ctx.sender().platform_id;

        if let Some(flow) = self.sessions.get(user) {
            if is_cancel(text, &self.config.bot_username) {
                debug!(platform_id = %user, flow = flow.describe(), "Flow cancelled");
                return Ok(Outcome::clear().reply(ctx.text(format!("❌ Cancelled {}.", flow.describe()))));
            }
            return match flow {
                Flow::TaskCreation(draft) => task_creation::handle_text(ctx, draft, text).await,
                Flow::TaskEdit { task_id, field } => task_edit::handle_text(ctx, task_id, field, text).await,
                Flow::ProjectRename { project_id } => {
                    project::handle_rename_text(ctx, project_id, text).await
                }
                Flow::ProjectDescription { project_id } => {
                    project::handle_description_text(ctx, project_id, text).await
                }
            };
        }

        match parse_command(text, &self.config.bot_username) {
            Some(command) => {
                debug!(chat_id = %ctx.chat_id(), command = command.name(), "Command");
                self.on_command(ctx, command).await
            }
            None => Ok(self.unrecognized(ctx, text)),
        }
    }

    async fn on_command(&self, ctx: &FlowContext<'_>, command: Command) -> Result<Outcome> {
        match command {
            Command::Start => match ctx.store.fetch_project_by_chat(ctx.chat_id()).await {
                Ok(_) => self.create_project(ctx).await,
                Err(e) if e.is_not_found() => {
                    Ok(Outcome::keep().reply(ctx.view(views::project_confirmation())))
                }
                Err(e) => Err(e.into()),
            },
            Command::CreateProject => self.create_project(ctx).await,
            Command::CreateTask => self.start_task_creation(ctx).await,
            Command::MyTasks => self.my_tasks(ctx).await,
            Command::ProjectTasks => self.project_tasks(ctx).await,
            Command::Manage => project::show_management(ctx).await,
            Command::RenameProject => project::start_rename(ctx).await,
            Command::Status => Ok(self.status(ctx)),
            Command::Home => self.home(ctx).await,
            Command::Help => Ok(Outcome::keep().reply(ctx.text(views::help_text()))),
            Command::Cancel => Ok(self.cancel(ctx)),
        }
    }

    async fn on_callback(
        &self,
        ctx: &FlowContext<'_>,
        action: CallbackAction,
        message_id: i32,
    ) -> Result<Outcome> {
        match action {
            CallbackAction::CreateProject | CallbackAction::ConfirmCreateProject => {
                self.create_project(ctx).await
            }
            CallbackAction::CancelCreateProject => {
                Ok(Outcome::keep().reply(ctx.text("❌ Project creation cancelled.")))
            }
            CallbackAction::CreateTask => self.start_task_creation(ctx).await,
            CallbackAction::MyTasks => self.my_tasks(ctx).await,
            CallbackAction::ProjectTasks => self.project_tasks(ctx).await,
            CallbackAction::BackToMenu => self.home(ctx).await,
            CallbackAction::Status => Ok(self.status(ctx)),
            CallbackAction::ProjectManagement => project::show_management(ctx).await,
            CallbackAction::RenameProject => project::start_rename(ctx).await,
            CallbackAction::EditProjectDescription => project::start_description(ctx).await,
            CallbackAction::AssignManager => project::show_promotions(ctx).await,
            CallbackAction::PromoteToManager(user_id) => project::promote(ctx, user_id).await,
            CallbackAction::DeleteProject => project::confirm_delete(ctx).await,
            CallbackAction::ConfirmDeleteProject => project::delete(ctx).await,
            CallbackAction::ToggleArchive => project::toggle_archive(ctx).await,
            CallbackAction::ToggleHideCompleted => project::toggle_hide_completed(ctx).await,
            CallbackAction::SkipStep => match self.sessions.get(ctx.sender().platform_id) {
                Some(Flow::TaskCreation(draft)) => task_creation::skip(ctx, draft).await,
                _ => Ok(Outcome::keep()),
            },
            CallbackAction::CancelFlow => Ok(self.cancel(ctx)),
            CallbackAction::ShowTask(task_id) => task_edit::show(ctx, task_id).await,
            CallbackAction::EditField(task_id, field) => task_edit::start(ctx, task_id, field).await,
            CallbackAction::ClearField(task_id, field) => {
                task_edit::clear_field(ctx, task_id, field).await
            }
            CallbackAction::SetStatus(task_id, status) => {
                task_edit::set_status(ctx, task_id, status).await
            }
            CallbackAction::Calendar(calendar) => self.on_calendar(ctx, calendar, message_id).await,
            CallbackAction::Noop => Ok(Outcome::keep()),
        }
    }

    async fn on_calendar(
        &self,
        ctx: &FlowContext<'_>,
        action: CalendarAction,
        message_id: i32,
    ) -> Result<Outcome> {
        let session = self.sessions.get(ctx.sender().platform_id);

        match action {
            CalendarAction::Ignore => Ok(Outcome::keep()),
            CalendarAction::Skip => match session {
                Some(Flow::TaskCreation(draft)) if draft.step == TaskCreationStep::Deadline => {
                    task_creation::skip(ctx, draft).await
                }
                _ => Ok(Outcome::keep()),
            },
            CalendarAction::Month { year, month } => {
                let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
                    return Ok(Outcome::keep());
                };
                let mode = match session {
                    Some(Flow::TaskEdit {
                        task_id,
                        field: TaskField::Deadline,
                    }) => {
                        let has_deadline = task_edit::load_task(ctx, task_id)
                            .await?
                            .is_some_and(|task| task.deadline.is_some());
                        CalendarMode::Edit(task_id, has_deadline)
                    }
                    _ => CalendarMode::Creation,
                };
                Ok(Outcome::keep().reply(Reply::EditKeyboard {
                    chat_id: ctx.chat_id(),
                    message_id,
                    keyboard: views::calendar(first, self.clock.today(), mode),
                }))
            }
            CalendarAction::Date(date) => {
                let text = format_date(date);
                let outcome = match session {
                    Some(Flow::TaskCreation(draft)) if draft.step == TaskCreationStep::Deadline => {
                        task_creation::handle_text(ctx, draft, &text).await?
                    }
                    Some(Flow::TaskEdit {
                        task_id,
                        field: TaskField::Deadline,
                    }) => task_edit::handle_text(ctx, task_id, TaskField::Deadline, &text).await?,
                    _ => {
                        return Ok(Outcome::keep()
                            .reply(ctx.text("ℹ️ This calendar is no longer active.")))
                    }
                };

                let mut replies = vec![Reply::Delete {
                    chat_id: ctx.chat_id(),
                    message_id,
                }];
                replies.extend(outcome.replies);
                Ok(Outcome {
                    session: outcome.session,
                    replies,
                })
            }
        }
    }

    /// Applies a session update and returns the replies to send.
    fn apply(&self, ctx: &FlowContext<'_>, outcome: Outcome) -> Vec<Reply> {
        let user = ctx.sender().platform_id;
        let mut replies = Vec::with_capacity(outcome.replies.len() + 1);

        match outcome.session {
            SessionUpdate::Keep => {}
            SessionUpdate::Start(flow) => {
                if let Some(previous) = self.sessions.set(user, flow.clone()) {
                    if previous != flow {
                        debug!(platform_id = %user, flow = previous.describe(), "Flow replaced");
                        replies.push(ctx.text(format!(
                            "ℹ️ The previous {} was cancelled.",
                            previous.describe()
                        )));
                    }
                }
            }
            SessionUpdate::Set(flow) => {
                self.sessions.set(user, flow);
            }
            SessionUpdate::Clear => {
                self.sessions.clear(user);
            }
            SessionUpdate::EndEdit(task_id) => {
                if let Some(Flow::TaskEdit { task_id: active, .. }) = self.sessions.get(user) {
                    if active == task_id {
                        self.sessions.clear(user);
                    }
                }
            }
        }

        replies.extend(outcome.replies);
        replies
    }

    fn cancel(&self, ctx: &FlowContext<'_>) -> Outcome {
        match self.sessions.get(ctx.sender().platform_id) {
            Some(flow) => Outcome::clear().reply(ctx.text(format!("❌ Cancelled {}.", flow.describe()))),
            None => Outcome::keep().reply(ctx.text("ℹ️ Nothing to cancel.")),
        }
    }

    fn status(&self, ctx: &FlowContext<'_>) -> Outcome {
        Outcome::keep().reply(ctx.text(views::status_text(&self.config.version)))
    }

    fn unrecognized(&self, ctx: &FlowContext<'_>, text: &str) -> Outcome {
        if ctx.event.chat.is_private || is_command_for_us(text, &self.config.bot_username) {
            Outcome::keep().reply(ctx.text("❓ Unknown command. Send /help to see what I can do."))
        } else {
            Outcome::keep()
        }
    }

    /// Project of the current chat, or the reply explaining it is missing.
    async fn chat_project(
        &self,
        ctx: &FlowContext<'_>,
    ) -> Result<std::result::Result<Project, Outcome>> {
        match ctx.store.fetch_project_by_chat(ctx.chat_id()).await {
            Ok(project) => Ok(Ok(project)),
            Err(e) if e.is_not_found() => Ok(Err(Outcome::keep().reply(ctx.text(NO_PROJECT)))),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_project(&self, ctx: &FlowContext<'_>) -> Result<Outcome> {
        let (project, created) =
            ensure_project(ctx.store, ctx.chat_id(), &ctx.event.project_title()).await?;
        let user = ensure_user(ctx.store, ctx.sender()).await?;
        let (role, _) = ensure_membership(ctx.store, project.id, user.id).await?;

        let notice = if created {
            format!(
                "✅ Project \"{}\" created. Your role: {}.",
                html_escape(&project.title),
                role
            )
        } else {
            format!(
                "ℹ️ This chat already has the project \"{}\". Your role: {}.",
                html_escape(&project.title),
                role
            )
        };
        Ok(Outcome::keep()
            .reply(ctx.text(notice))
            .reply(ctx.main_menu(&project).await?))
    }

    async fn home(&self, ctx: &FlowContext<'_>) -> Result<Outcome> {
        match self.chat_project(ctx).await? {
            Ok(project) => Ok(Outcome::keep().reply(ctx.main_menu(&project).await?)),
            Err(outcome) => Ok(outcome),
        }
    }

    async fn start_task_creation(&self, ctx: &FlowContext<'_>) -> Result<Outcome> {
        let project = match self.chat_project(ctx).await? {
            Ok(project) => project,
            Err(outcome) => return Ok(outcome),
        };
        if project.is_archived {
            return Ok(Outcome::keep().reply(ctx.text(
                "🗄 This project is archived. A manager has to unarchive it before new tasks can be created.",
            )));
        }

        let user = ensure_user(ctx.store, ctx.sender()).await?;
        ensure_membership(ctx.store, project.id, user.id).await?;
        Ok(task_creation::start(ctx, &project, &user))
    }

    async fn my_tasks(&self, ctx: &FlowContext<'_>) -> Result<Outcome> {
        let project = match self.chat_project(ctx).await? {
            Ok(project) => project,
            Err(outcome) => return Ok(outcome),
        };
        let user = ensure_user(ctx.store, ctx.sender()).await?;

        let filter = TaskFilter::new()
            .with_project_id(project.id)
            .with_assignee(user.id);
        let tasks = ctx.store.filter_tasks(&filter).await?;
        let tasks = visible_tasks(&project, tasks, self.clock.now(), self.config.recency_window);

        let lines: Vec<TaskLine<'_>> = tasks
            .iter()
            .map(|task| TaskLine {
                task,
                assignee: None,
            })
            .collect();
        Ok(Outcome::keep().reply(ctx.view(views::my_tasks(&lines))))
    }

    async fn project_tasks(&self, ctx: &FlowContext<'_>) -> Result<Outcome> {
        let project = match self.chat_project(ctx).await? {
            Ok(project) => project,
            Err(outcome) => return Ok(outcome),
        };
        if !is_manager(ctx.store, project.id, ctx.sender().platform_id).await? {
            return Ok(Outcome::keep()
                .reply(ctx.text("❌ You don't have permission to view all project tasks.")));
        }

        let filter = TaskFilter::new().with_project_id(project.id);
        let tasks = ctx.store.filter_tasks(&filter).await?;
        let tasks = visible_tasks(&project, tasks, self.clock.now(), self.config.recency_window);

        let mut names: HashMap<UserId, String> = HashMap::new();
        for id in tasks.iter().filter_map(|task| task.assignee) {
            if !names.contains_key(&id) {
                let name = ctx.user_name(id).await;
                names.insert(id, name);
            }
        }

        let lines: Vec<TaskLine<'_>> = tasks
            .iter()
            .map(|task| TaskLine {
                task,
                assignee: task.assignee.and_then(|id| names.get(&id).cloned()),
            })
            .collect();
        Ok(Outcome::keep().reply(ctx.view(views::project_tasks(&lines))))
    }
}

/// Whether unparsed text still looks like a slash-command meant for this bot.
fn is_command_for_us(text: &str, bot_username: &str) -> bool {
    let mut words = text.split_whitespace();
    let Some(mut word) = words.next() else {
        return false;
    };

    if let Some(handle) = word.strip_prefix('@') {
        if !handle.eq_ignore_ascii_case(bot_username) {
            return false;
        }
        match words.next() {
            Some(next) => word = next,
            None => return false,
        }
    }

    let Some(command) = word.strip_prefix('/') else {
        return false;
    };
    match command.split_once('@') {
        Some((_, target)) => target.eq_ignore_ascii_case(bot_username),
        None => true,
    }
}
