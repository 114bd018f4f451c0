//! Rendering of menus, listings and prompts.
//!
//! Texts are Telegram-flavoured HTML; every user-supplied string goes
//! through [`html_escape`].

use chrono::{Datelike, Duration, NaiveDate};

use taskbot_models::{Membership, Project, Role, Task, TaskField, TaskId, TaskStatus};

use crate::dates::format_deadline;
use crate::intent::{CalendarAction, CallbackAction, Command};
use crate::reply::{Button, Keyboard};

pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Label for an optional assignee.
pub fn assignee_label(name: Option<&str>) -> String {
    match name {
        Some(name) => html_escape(name),
        None => "<i>Unassigned</i>".to_string(),
    }
}

pub fn project_confirmation() -> (String, Keyboard) {
    let text = "🚀 <b>Create a project</b>\n\n\
                Create a task tracker for this chat? You will become its manager \
                and administer its tasks."
        .to_string();
    let keyboard = Keyboard::new().row(vec![
        Button::new("✅ Continue", CallbackAction::ConfirmCreateProject),
        Button::new("❌ Cancel", CallbackAction::CancelCreateProject),
    ]);
    (text, keyboard)
}

pub fn main_menu(project: &Project, is_manager: bool) -> (String, Keyboard) {
    let mut text = format!("🤖 <b>Task tracker for \"{}\"</b>", html_escape(&project.title));
    if project.is_archived {
        text.push_str("\n\n🗄 <i>This project is archived.</i>");
    }

    let mut keyboard = Keyboard::new()
        .button("📝 Create task", CallbackAction::CreateTask)
        .button("📋 My tasks", CallbackAction::MyTasks);
    if is_manager {
        keyboard = keyboard
            .button("📂 Project tasks", CallbackAction::ProjectTasks)
            .button("⚙️ Project management", CallbackAction::ProjectManagement);
    }
    (text, keyboard.button("📊 Bot status", CallbackAction::Status))
}

/// One row of a task listing.
pub struct TaskLine<'a> {
    pub task: &'a Task,
    pub assignee: Option<String>,
}

fn task_list(heading: &str, empty: &str, lines: &[TaskLine<'_>], show_assignee: bool) -> (String, Keyboard) {
    let mut keyboard = Keyboard::new();
    let text = if lines.is_empty() {
        format!("{}\n\n<i>{}</i>", heading, empty)
    } else {
        for line in lines {
            let task = line.task;
            let mut label = format!("{} #{} {}", task.status.emoji(), task.id, task.title);
            if show_assignee {
                label.push_str(" - ");
                label.push_str(line.assignee.as_deref().unwrap_or("Unassigned"));
            }
            keyboard = keyboard.button(label, CallbackAction::ShowTask(task.id));
        }
        format!("{}\n\n<i>Tasks: {}</i>", heading, lines.len())
    };
    (text, keyboard.button("🏠 Home", CallbackAction::BackToMenu))
}

pub fn my_tasks(lines: &[TaskLine<'_>]) -> (String, Keyboard) {
    task_list("📋 <b>My tasks</b>", "You have no assigned tasks yet.", lines, false)
}

pub fn project_tasks(lines: &[TaskLine<'_>]) -> (String, Keyboard) {
    task_list("📂 <b>Project tasks</b>", "This project has no tasks yet.", lines, true)
}

/// Task card with one edit button per field.
pub fn task_detail(task: &Task, assignee: Option<&str>, is_manager: bool) -> (String, Keyboard) {
    let mut text = format!("<b>Task #{}: {}</b>\n\n", task.id, html_escape(&task.title));
    text.push_str(&format!(
        "<b>Status:</b> {} {}\n",
        task.status.emoji(),
        task.status.label()
    ));
    text.push_str(&format!("<b>Assignee:</b> {}\n", assignee_label(assignee)));
    if let Some(deadline) = task.deadline {
        text.push_str(&format!("<b>Deadline:</b> {}\n", format_deadline(deadline)));
    }
    match task.description() {
        Some(description) => text.push_str(&format!("\n{}", html_escape(description))),
        None => text.push_str("\n<i>No description</i>"),
    }

    let back = if is_manager {
        Button::new("🔙 Project tasks", CallbackAction::ProjectTasks)
    } else {
        Button::new("🔙 My tasks", CallbackAction::MyTasks)
    };
    let keyboard = Keyboard::new()
        .button("✏️ Title", CallbackAction::EditField(task.id, TaskField::Title))
        .button("📄 Description", CallbackAction::EditField(task.id, TaskField::Description))
        .button("📊 Status", CallbackAction::EditField(task.id, TaskField::Status))
        .button("📅 Deadline", CallbackAction::EditField(task.id, TaskField::Deadline))
        .button("👤 Assignee", CallbackAction::EditField(task.id, TaskField::Assignee))
        .row(vec![back]);
    (text, keyboard)
}

/// Status buttons for every status except the current one.
pub fn status_choices(task: &Task) -> Keyboard {
    TaskStatus::ALL
        .into_iter()
        .filter(|status| *status != task.status)
        .fold(Keyboard::new(), |keyboard, status| {
            keyboard.button(
                format!("{} {}", status.emoji(), status.label()),
                CallbackAction::SetStatus(task.id, status),
            )
        })
        .button("🔙 Back", CallbackAction::ShowTask(task.id))
}

/// Prompt shown when a field edit starts.
pub fn field_prompt(
    task: &Task,
    field: TaskField,
    assignee: Option<&str>,
    today: NaiveDate,
) -> (String, Keyboard) {
    let back = CallbackAction::ShowTask(task.id);
    match field {
        TaskField::Title => (
            format!(
                "✏️ <b>Editing title of task #{}</b>\n\nCurrent title: {}\n\nSend the new title:",
                task.id,
                html_escape(&task.title)
            ),
            Keyboard::new().button("🔙 Back", back),
        ),
        TaskField::Description => (
            format!(
                "📄 <b>Editing description of task #{}</b>\n\nCurrent description: {}\n\nSend the new description:",
                task.id,
                task.description()
                    .map(html_escape)
                    .unwrap_or_else(|| "<i>none</i>".to_string())
            ),
            Keyboard::new()
                .button(
                    "🗑 Clear description",
                    CallbackAction::ClearField(task.id, TaskField::Description),
                )
                .button("🔙 Back", back),
        ),
        TaskField::Status => (
            format!(
                "📊 <b>Editing status of task #{}</b>\n\nCurrent status: {} {}\n\nPick the new status:",
                task.id,
                task.status.emoji(),
                task.status.label()
            ),
            status_choices(task),
        ),
        TaskField::Deadline => (
            format!(
                "📅 <b>Editing deadline of task #{}</b>\n\nCurrent deadline: {}\n\n\
                 Pick a day below or send a date as DD.MM.YYYY:",
                task.id,
                task.deadline
                    .map(format_deadline)
                    .unwrap_or_else(|| "<i>not set</i>".to_string())
            ),
            calendar(today, today, CalendarMode::Edit(task.id, task.deadline.is_some())),
        ),
        TaskField::Assignee => {
            let mut keyboard = Keyboard::new();
            if task.assignee.is_some() {
                keyboard = keyboard.button(
                    "🗑 Remove assignee",
                    CallbackAction::ClearField(task.id, TaskField::Assignee),
                );
            }
            (
                format!(
                    "👤 <b>Editing assignee of task #{}</b>\n\nCurrent assignee: {}\n\n\
                     Send:\n• @username to assign someone\n• 'me' to take it yourself\n• '-' to unassign",
                    task.id,
                    assignee_label(assignee)
                ),
                keyboard.button("🔙 Back", back),
            )
        }
    }
}

/// Where a calendar is shown, which decides its footer rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarMode {
    /// Deadline step of task creation.
    Creation,
    /// Deadline edit of a task; the flag says whether a deadline is set.
    Edit(TaskId, bool),
}

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

const WEEKDAYS: [&str; 7] = ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"];

fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + month as i32 - 1 + delta;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

fn ignore(label: &str) -> Button {
    Button::new(label, CallbackAction::Calendar(CalendarAction::Ignore))
}

/// Month grid starting on Monday. Days before `today` cannot be picked.
pub fn calendar(month: NaiveDate, today: NaiveDate, mode: CalendarMode) -> Keyboard {
    let (year, month_no) = (month.year(), month.month());
    let (prev_year, prev_month) = shift_month(year, month_no, -1);
    let (next_year, next_month) = shift_month(year, month_no, 1);

    let mut keyboard = Keyboard::new()
        .row(vec![
            Button::new(
                "◀",
                CallbackAction::Calendar(CalendarAction::Month {
                    year: prev_year,
                    month: prev_month,
                }),
            ),
            ignore(&format!("{} {}", MONTH_NAMES[month_no as usize - 1], year)),
            Button::new(
                "▶",
                CallbackAction::Calendar(CalendarAction::Month {
                    year: next_year,
                    month: next_month,
                }),
            ),
        ])
        .row(WEEKDAYS.iter().copied().map(ignore).collect());

    if let Some(first) = NaiveDate::from_ymd_opt(year, month_no, 1) {
        let mut row: Vec<Button> = (0..first.weekday().num_days_from_monday())
            .map(|_| ignore(" "))
            .collect();

        let mut day = first;
        while day.month() == month_no {
            if day < today {
                row.push(ignore("·"));
            } else {
                row.push(Button::new(
                    day.day().to_string(),
                    CallbackAction::Calendar(CalendarAction::Date(day)),
                ));
            }
            if row.len() == 7 {
                keyboard = keyboard.row(std::mem::take(&mut row));
            }
            day += Duration::days(1);
        }

        if !row.is_empty() {
            while row.len() < 7 {
                row.push(ignore(" "));
            }
            keyboard = keyboard.row(row);
        }
    }

    match mode {
        CalendarMode::Creation => keyboard.button(
            "⏭ Skip deadline",
            CallbackAction::Calendar(CalendarAction::Skip),
        ),
        CalendarMode::Edit(task_id, has_deadline) => {
            if has_deadline {
                keyboard = keyboard.button(
                    "🗑 Remove deadline",
                    CallbackAction::ClearField(task_id, TaskField::Deadline),
                );
            }
            keyboard.button("🔙 Back", CallbackAction::ShowTask(task_id))
        }
    }
}

pub fn management_menu(project: &Project) -> (String, Keyboard) {
    let mut text = format!(
        "⚙️ <b>Project management</b>\n\n<b>Project:</b> {}\n<b>Description:</b> {}",
        html_escape(&project.title),
        project
            .description()
            .map(html_escape)
            .unwrap_or_else(|| "<i>not set</i>".to_string())
    );
    if project.is_archived {
        text.push_str("\n<b>Archived:</b> yes");
    }

    let archive_label = if project.is_archived {
        "📤 Unarchive project"
    } else {
        "🗄 Archive project"
    };
    let hide_label = if project.hide_completed {
        "👁 Show completed tasks"
    } else {
        "🙈 Hide completed tasks"
    };

    let keyboard = Keyboard::new()
        .button("✏️ Rename project", CallbackAction::RenameProject)
        .button("📝 Edit description", CallbackAction::EditProjectDescription)
        .button("👤 Assign manager", CallbackAction::AssignManager)
        .button(archive_label, CallbackAction::ToggleArchive)
        .button(hide_label, CallbackAction::ToggleHideCompleted)
        .button("❌ Delete project", CallbackAction::DeleteProject)
        .button("🔙 Back", CallbackAction::BackToMenu);
    (text, keyboard)
}

/// Members eligible for promotion, or a notice when there are none.
pub fn promotion_list(members: &[Membership]) -> (String, Keyboard) {
    let mut keyboard = Keyboard::new();
    let mut count = 0;
    for membership in members {
        match membership.role {
            Role::Member => {
                count += 1;
                keyboard = keyboard.button(
                    membership.user.display_name(),
                    CallbackAction::PromoteToManager(membership.user.id),
                );
            }
            Role::Manager => {}
        }
    }

    let text = if count == 0 {
        "👤 <b>Assign manager</b>\n\n<i>There are no members to promote.</i>".to_string()
    } else {
        "👤 <b>Assign manager</b>\n\nPick a member to promote:".to_string()
    };
    (
        text,
        keyboard.button("🔙 Back", CallbackAction::ProjectManagement),
    )
}

pub fn delete_confirmation(project: &Project) -> (String, Keyboard) {
    let text = format!(
        "⚠️ <b>Delete project</b>\n\nReally delete \"{}\"?\n\n\
         All tasks and data of the project will be removed permanently!",
        html_escape(&project.title)
    );
    let keyboard = Keyboard::new().row(vec![
        Button::new("🗑 Delete", CallbackAction::ConfirmDeleteProject),
        Button::new("❌ Cancel", CallbackAction::ProjectManagement),
    ]);
    (text, keyboard)
}

pub fn status_text(version: &str) -> String {
    format!(
        "🤖 <b>Status</b>\n\n✅ Running\n📊 Version: {}",
        html_escape(version)
    )
}

pub fn help_text() -> String {
    let mut text = "ℹ️ <b>Commands</b>\n".to_string();
    for (command, description) in Command::ALL {
        text.push_str(&format!("\n/{} - {}", command.name(), description));
    }
    text.push_str("\n\nDates are entered as DD.MM.YYYY, for example 25.12.2025. Send /cancel to abort any dialog.");
    text
}
