//! Parsing of slash-commands and callback payloads into structured intents.
//!
//! Callback payloads are parsed exactly once at the edge; everything past the
//! dispatcher works with [`CallbackAction`] values.

use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use taskbot_models::{TaskField, TaskId, TaskStatus, UserId};

/// Words that abort any active flow.
pub const CANCEL_WORDS: [&str; 3] = ["/cancel", "cancel", "отмена"];

/// Slash-commands understood by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Start,
    CreateProject,
    CreateTask,
    MyTasks,
    ProjectTasks,
    Manage,
    RenameProject,
    Status,
    Home,
    Help,
    Cancel,
}

impl Command {
    /// Every command with its description, in menu order.
    pub const ALL: [(Command, &'static str); 11] = [
        (Command::Start, "Set up the project for this chat"),
        (Command::CreateProject, "Create the project without confirmation"),
        (Command::CreateTask, "Create a new task"),
        (Command::MyTasks, "Show tasks assigned to me"),
        (Command::ProjectTasks, "Show all project tasks"),
        (Command::Manage, "Project management"),
        (Command::RenameProject, "Rename the project"),
        (Command::Status, "Show bot status"),
        (Command::Home, "Show the main menu"),
        (Command::Help, "Show help"),
        (Command::Cancel, "Cancel the current action"),
    ];

    /// Command name without the slash.
    pub fn name(self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::CreateProject => "create_project",
            Command::CreateTask => "create_task",
            Command::MyTasks => "my_tasks",
            Command::ProjectTasks => "project_tasks",
            Command::Manage => "manage",
            Command::RenameProject => "rename_project",
            Command::Status => "status",
            Command::Home => "home",
            Command::Help => "help",
            Command::Cancel => "cancel",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Command::ALL
            .iter()
            .map(|(command, _)| *command)
            .find(|command| command.name() == name)
    }
}

/// Parses a slash-command.
///
/// Accepts `/cmd`, `/cmd@bot` and `@bot /cmd`. A command explicitly
/// addressed to another bot is not ours and yields `None`.
pub fn parse_command(text: &str, bot_username: &str) -> Option<Command> {
    let mut text = text.trim();

    if let Some(rest) = text.strip_prefix('@') {
        let (handle, tail) = rest.split_once(char::is_whitespace)?;
        if !handle.eq_ignore_ascii_case(bot_username) {
            return None;
        }
        text = tail.trim_start();
    }

    let word = text.strip_prefix('/')?.split_whitespace().next()?;
    let name = match word.split_once('@') {
        Some((name, target)) => {
            if !target.eq_ignore_ascii_case(bot_username) {
                return None;
            }
            name
        }
        None => word,
    };

    Command::from_name(&name.to_lowercase())
}

/// Whether text aborts the current flow.
pub fn is_cancel(text: &str, bot_username: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    CANCEL_WORDS.contains(&lowered.as_str())
        || parse_command(text, bot_username) == Some(Command::Cancel)
}

/// Calendar widget actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarAction {
    /// Header, weekday, padding or past-day cell.
    Ignore,
    /// Skip the deadline step.
    Skip,
    /// Navigate to another month.
    Month { year: i32, month: u32 },
    /// A day was picked.
    Date(NaiveDate),
}

/// Parsed callback payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    CreateProject,
    ConfirmCreateProject,
    CancelCreateProject,
    CreateTask,
    MyTasks,
    ProjectTasks,
    BackToMenu,
    Status,
    ProjectManagement,
    RenameProject,
    EditProjectDescription,
    AssignManager,
    DeleteProject,
    ConfirmDeleteProject,
    ToggleArchive,
    ToggleHideCompleted,
    /// Skip the current task-creation step.
    SkipStep,
    /// Abort the active flow.
    CancelFlow,
    ShowTask(TaskId),
    EditField(TaskId, TaskField),
    ClearField(TaskId, TaskField),
    SetStatus(TaskId, TaskStatus),
    PromoteToManager(UserId),
    Calendar(CalendarAction),
    Noop,
}

/// Callback data that does not match any known action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized callback data: {0}")]
pub struct UnknownCallback(pub String);

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackAction::CreateProject => f.write_str("cmd_create_project"),
            CallbackAction::ConfirmCreateProject => f.write_str("confirm_create_project"),
            CallbackAction::CancelCreateProject => f.write_str("cancel_create_project"),
            CallbackAction::CreateTask => f.write_str("cmd_create_task"),
            CallbackAction::MyTasks => f.write_str("cmd_my_tasks"),
            CallbackAction::ProjectTasks => f.write_str("cmd_project_tasks"),
            CallbackAction::BackToMenu => f.write_str("cmd_back_to_menu"),
            CallbackAction::Status => f.write_str("cmd_status"),
            CallbackAction::ProjectManagement => f.write_str("cmd_project_management"),
            CallbackAction::RenameProject => f.write_str("cmd_rename_project"),
            CallbackAction::EditProjectDescription => f.write_str("cmd_edit_project_description"),
            CallbackAction::AssignManager => f.write_str("cmd_assign_manager"),
            CallbackAction::DeleteProject => f.write_str("cmd_delete_project"),
            CallbackAction::ConfirmDeleteProject => f.write_str("confirm_delete_project"),
            CallbackAction::ToggleArchive => f.write_str("cmd_toggle_archive"),
            CallbackAction::ToggleHideCompleted => f.write_str("cmd_toggle_hide_completed"),
            CallbackAction::SkipStep => f.write_str("tc_skip"),
            CallbackAction::CancelFlow => f.write_str("flow_cancel"),
            CallbackAction::ShowTask(id) => write!(f, "task_{}", id),
            CallbackAction::EditField(id, field) => write!(f, "edit_field_{}_{}", id, field),
            CallbackAction::ClearField(id, field) => write!(f, "clear_field_{}_{}", id, field),
            CallbackAction::SetStatus(id, status) => write!(f, "set_status_{}_{}", id, status),
            CallbackAction::PromoteToManager(id) => write!(f, "promote_to_manager_{}", id),
            CallbackAction::Calendar(CalendarAction::Ignore) => f.write_str("cal_ignore"),
            CallbackAction::Calendar(CalendarAction::Skip) => f.write_str("cal_skip"),
            CallbackAction::Calendar(CalendarAction::Month { year, month }) => {
                write!(f, "cal_month_{}_{}", year, month)
            }
            CallbackAction::Calendar(CalendarAction::Date(date)) => {
                write!(f, "cal_date_{}_{}_{}", date.year(), date.month(), date.day())
            }
            CallbackAction::Noop => f.write_str("noop"),
        }
    }
}

/// Splits `<id>_<rest>` and parses both halves.
fn split_id<T: FromStr>(s: &str) -> Option<(TaskId, T)> {
    let (id, rest) = s.split_once('_')?;
    Some((id.parse().ok()?, rest.parse().ok()?))
}

fn parse_calendar(s: &str) -> Option<CalendarAction> {
    match s {
        "ignore" => return Some(CalendarAction::Ignore),
        "skip" => return Some(CalendarAction::Skip),
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("month_") {
        let (year, month) = rest.split_once('_')?;
        let year: i32 = year.parse().ok()?;
        let month: u32 = month.parse().ok()?;
        // Validates the month number.
        NaiveDate::from_ymd_opt(year, month, 1)?;
        return Some(CalendarAction::Month { year, month });
    }

    if let Some(rest) = s.strip_prefix("date_") {
        let mut parts = rest.splitn(3, '_');
        let year = parts.next()?.parse().ok()?;
        let month = parts.next()?.parse().ok()?;
        let day = parts.next()?.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day).map(CalendarAction::Date);
    }

    None
}

fn parse_callback(s: &str) -> Option<CallbackAction> {
    let action = match s {
        "cmd_create_project" => CallbackAction::CreateProject,
        "confirm_create_project" => CallbackAction::ConfirmCreateProject,
        "cancel_create_project" => CallbackAction::CancelCreateProject,
        "cmd_create_task" => CallbackAction::CreateTask,
        "cmd_my_tasks" => CallbackAction::MyTasks,
        "cmd_project_tasks" => CallbackAction::ProjectTasks,
        "cmd_back_to_menu" => CallbackAction::BackToMenu,
        "cmd_status" => CallbackAction::Status,
        "cmd_project_management" => CallbackAction::ProjectManagement,
        "cmd_rename_project" => CallbackAction::RenameProject,
        "cmd_edit_project_description" => CallbackAction::EditProjectDescription,
        "cmd_assign_manager" => CallbackAction::AssignManager,
        "cmd_delete_project" => CallbackAction::DeleteProject,
        "confirm_delete_project" => CallbackAction::ConfirmDeleteProject,
        "cmd_toggle_archive" => CallbackAction::ToggleArchive,
        "cmd_toggle_hide_completed" => CallbackAction::ToggleHideCompleted,
        "tc_skip" => CallbackAction::SkipStep,
        "flow_cancel" => CallbackAction::CancelFlow,
        "noop" => CallbackAction::Noop,
        _ => {
            if let Some(rest) = s.strip_prefix("cal_") {
                return parse_calendar(rest).map(CallbackAction::Calendar);
            }
            if let Some(rest) = s.strip_prefix("task_") {
                return rest.parse().ok().map(CallbackAction::ShowTask);
            }
            if let Some(rest) = s.strip_prefix("edit_field_") {
                let (id, field) = split_id(rest)?;
                return Some(CallbackAction::EditField(id, field));
            }
            if let Some(rest) = s.strip_prefix("clear_field_") {
                let (id, field) = split_id(rest)?;
                return Some(CallbackAction::ClearField(id, field));
            }
            if let Some(rest) = s.strip_prefix("set_status_") {
                // Status names may themselves contain underscores.
                let (id, status) = split_id(rest)?;
                return Some(CallbackAction::SetStatus(id, status));
            }
            if let Some(rest) = s.strip_prefix("promote_to_manager_") {
                return rest.parse().ok().map(CallbackAction::PromoteToManager);
            }
            return None;
        }
    };
    Some(action)
}

impl FromStr for CallbackAction {
    type Err = UnknownCallback;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_callback(s).ok_or_else(|| UnknownCallback(s.to_string()))
    }
}
