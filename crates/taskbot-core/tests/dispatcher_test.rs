//! End-to-end conversations against the in-memory store.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use taskbot_core::dates::{end_of_day, format_date};
use taskbot_core::{
    BotConfig, CallbackAction, Chat, Clock, Dispatcher, Event, FixedClock, Flow, Reply, Sender,
    TaskCreationStep,
};
use taskbot_models::{
    ChatId, PlatformUserId, Role, Task, TaskField, TaskFilter, TaskStatus, User,
};
use taskbot_persistence::{MemoryStore, ProjectRepository, TaskRepository, UserRepository};

const GROUP: ChatId = ChatId(-100);

struct Harness {
    store: Arc<MemoryStore>,
    clock: FixedClock,
    dispatcher: Dispatcher,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(BotConfig::new("taskbot"))
    }

    fn with_config(config: BotConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = FixedClock(Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap());
        let dispatcher = Dispatcher::new(store.clone(), config).with_clock(Arc::new(clock));
        Self {
            store,
            clock,
            dispatcher,
        }
    }

    fn chat() -> Chat {
        Chat {
            id: GROUP,
            title: Some("Team".to_string()),
            is_private: false,
        }
    }

    fn sender(id: i64, username: &str) -> Sender {
        Sender {
            platform_id: PlatformUserId(id),
            full_name: format!("User {}", id),
            username: Some(username.to_string()),
        }
    }

    async fn say(&self, id: i64, username: &str, text: &str) -> Vec<Reply> {
        let event = Event::text(Self::chat(), Self::sender(id, username), text);
        self.dispatcher.handle(&event).await
    }

    async fn press(&self, id: i64, username: &str, action: CallbackAction) -> Vec<Reply> {
        let event = Event::callback(Self::chat(), Self::sender(id, username), action.to_string(), 42);
        self.dispatcher.handle(&event).await
    }

    fn session(&self, id: i64) -> Option<Flow> {
        self.dispatcher.sessions().get(PlatformUserId(id))
    }

    async fn tasks(&self) -> Vec<Task> {
        self.store.filter_tasks(&TaskFilter::new()).await.unwrap()
    }

    /// Alice creates the project, Bob joins as a member.
    async fn team(&self) {
        self.say(1, "alice", "/create_project").await;
        self.say(2, "bob", "/create_task").await;
        self.say(2, "bob", "/cancel").await;
    }
}

fn texts(replies: &[Reply]) -> Vec<&str> {
    replies.iter().filter_map(Reply::message_text).collect()
}

fn any_text(replies: &[Reply], needle: &str) -> bool {
    texts(replies).iter().any(|text| text.contains(needle))
}

#[tokio::test]
async fn test_project_initialization_is_idempotent() {
    let h = Harness::new();

    h.say(1, "alice", "/create_project").await;
    let again = h.say(1, "alice", "/create_project").await;

    let project = h.store.fetch_project_by_chat(GROUP).await.unwrap();
    assert_eq!(project.title, "Team");
    assert_eq!(h.store.count_members(project.id).await.unwrap(), 1);
    assert!(any_text(&again, "already has the project"));
}

#[tokio::test]
async fn test_start_asks_for_confirmation() {
    let h = Harness::new();

    let replies = h.say(1, "alice", "/start").await;
    assert!(replies[0]
        .keyboard()
        .unwrap()
        .contains(&CallbackAction::ConfirmCreateProject));
    assert!(h.store.fetch_project_by_chat(GROUP).await.is_err());

    h.press(1, "alice", CallbackAction::ConfirmCreateProject).await;
    assert!(h.store.fetch_project_by_chat(GROUP).await.is_ok());
}

#[tokio::test]
async fn test_first_joiner_is_manager() {
    let h = Harness::new();
    h.team().await;

    let project = h.store.fetch_project_by_chat(GROUP).await.unwrap();
    let alice = h.store.fetch_user_by_platform_id(PlatformUserId(1)).await.unwrap();
    let bob = h.store.fetch_user_by_platform_id(PlatformUserId(2)).await.unwrap();
    assert_eq!(h.store.fetch_role(project.id, alice.id).await.unwrap(), Role::Manager);
    assert_eq!(h.store.fetch_role(project.id, bob.id).await.unwrap(), Role::Member);
}

#[tokio::test]
async fn test_skip_everything_creates_bare_task() {
    let h = Harness::new();
    h.say(1, "alice", "/create_project").await;

    h.say(1, "alice", "/create_task").await;
    h.say(1, "alice", "Fix bug").await;
    h.say(1, "alice", "-").await;
    h.say(1, "alice", "-").await;
    let done = h.say(1, "alice", "-").await;

    let tasks = h.tasks().await;
    assert_eq!(tasks.len(), 1);
    let task = &tasks[0];
    assert_eq!(task.title, "Fix bug");
    assert_eq!(task.status, TaskStatus::Todo);
    assert!(task.description().is_none());
    assert!(task.assignee.is_none());
    assert!(task.deadline.is_none());
    assert!(h.session(1).is_none());
    assert!(any_text(&done, "Task created"));
}

#[tokio::test]
async fn test_skip_buttons_walk_the_flow() {
    let h = Harness::new();
    h.say(1, "alice", "/create_project").await;

    h.press(1, "alice", CallbackAction::CreateTask).await;
    h.say(1, "alice", "Write docs").await;
    h.press(1, "alice", CallbackAction::SkipStep).await;
    h.press(1, "alice", CallbackAction::SkipStep).await;
    h.press(
        1,
        "alice",
        CallbackAction::Calendar(taskbot_core::CalendarAction::Skip),
    )
    .await;

    assert_eq!(h.tasks().await.len(), 1);
    assert!(h.session(1).is_none());
}

#[tokio::test]
async fn test_non_member_assignee_reprompts() {
    let h = Harness::new();
    h.say(1, "alice", "/create_project").await;
    // Carol is known to the bot but belongs to no project.
    h.store
        .create_user(User::new(PlatformUserId(3)).with_username(Some("carol".to_string())))
        .await
        .unwrap();

    h.say(1, "alice", "/create_task").await;
    h.say(1, "alice", "Fix bug").await;
    h.say(1, "alice", "-").await;
    let replies = h.say(1, "alice", "@carol").await;

    assert!(any_text(&replies, "not a member"));
    match h.session(1) {
        Some(Flow::TaskCreation(draft)) => assert_eq!(draft.step, TaskCreationStep::Assignee),
        other => panic!("unexpected session: {:?}", other),
    }
    assert!(h.tasks().await.is_empty());
}

#[tokio::test]
async fn test_assign_to_member_and_self() {
    let h = Harness::new();
    h.team().await;
    let bob = h.store.fetch_user_by_platform_id(PlatformUserId(2)).await.unwrap();

    h.say(1, "alice", "/create_task").await;
    h.say(1, "alice", "For Bob").await;
    h.say(1, "alice", "-").await;
    h.say(1, "alice", "@Bob").await;
    h.say(1, "alice", "-").await;

    h.say(2, "bob", "/create_task").await;
    h.say(2, "bob", "For me").await;
    h.say(2, "bob", "-").await;
    h.say(2, "bob", "me").await;
    h.say(2, "bob", "-").await;

    let tasks = h.tasks().await;
    assert_eq!(tasks.len(), 2);
    assert!(tasks.iter().all(|task| task.assignee == Some(bob.id)));
}

#[tokio::test]
async fn test_bot_cannot_be_assigned() {
    let h = Harness::new();
    h.say(1, "alice", "/create_project").await;

    h.say(1, "alice", "/create_task").await;
    h.say(1, "alice", "Fix bug").await;
    h.say(1, "alice", "-").await;
    let replies = h.say(1, "alice", "@TaskBot").await;

    assert!(any_text(&replies, "bot"));
    assert!(matches!(h.session(1), Some(Flow::TaskCreation(_))));
}

#[tokio::test]
async fn test_deadline_today_and_past() {
    let h = Harness::new();
    h.say(1, "alice", "/create_project").await;
    let today = h.clock.today();

    h.say(1, "alice", "/create_task").await;
    h.say(1, "alice", "Fix bug").await;
    h.say(1, "alice", "-").await;
    h.say(1, "alice", "-").await;

    let past = h.say(1, "alice", &format_date(today - Duration::days(1))).await;
    assert!(any_text(&past, "past"));
    assert!(h.tasks().await.is_empty());

    let malformed = h.say(1, "alice", "2025-12-25").await;
    assert!(any_text(&malformed, "format"));

    h.say(1, "alice", &format_date(today)).await;
    let tasks = h.tasks().await;
    assert_eq!(tasks[0].deadline, Some(end_of_day(today)));
    assert_eq!(tasks[0].deadline, Some(today.and_hms_opt(23, 59, 59).unwrap()));
}

#[tokio::test]
async fn test_calendar_date_is_normalized() {
    let h = Harness::new();
    h.say(1, "alice", "/create_project").await;
    let pick = h.clock.today() + Duration::days(5);

    h.say(1, "alice", "/create_task").await;
    h.say(1, "alice", "Fix bug").await;
    h.say(1, "alice", "-").await;
    h.say(1, "alice", "-").await;
    let replies = h
        .press(
            1,
            "alice",
            CallbackAction::Calendar(taskbot_core::CalendarAction::Date(pick)),
        )
        .await;

    assert!(matches!(replies[0], Reply::Delete { message_id: 42, .. }));
    assert_eq!(h.tasks().await[0].deadline, Some(end_of_day(pick)));
}

#[tokio::test]
async fn test_calendar_navigation_edits_keyboard() {
    let h = Harness::new();
    h.say(1, "alice", "/create_project").await;

    let replies = h
        .press(
            1,
            "alice",
            CallbackAction::Calendar(taskbot_core::CalendarAction::Month {
                year: 2025,
                month: 4,
            }),
        )
        .await;
    assert!(matches!(
        replies[0],
        Reply::EditKeyboard {
            message_id: 42,
            ..
        }
    ));
}

#[tokio::test]
async fn test_recency_filter_in_listing() {
    let h = Harness::new();
    h.say(1, "alice", "/create_project").await;
    let project = h.store.fetch_project_by_chat(GROUP).await.unwrap();
    let alice = h.store.fetch_user_by_platform_id(PlatformUserId(1)).await.unwrap();
    let now = h.clock.now();

    for (title, status, age) in [
        ("old done", TaskStatus::Done, Duration::days(4)),
        ("fresh done", TaskStatus::Done, Duration::days(1)),
        ("stale progress", TaskStatus::InProgress, Duration::days(30)),
    ] {
        let mut task = Task::new(project.id, title, alice.id);
        task.status = status;
        task.assignee = Some(alice.id);
        task.updated_at = now - age;
        h.store.create_task(task).await.unwrap();
    }

    let replies = h.say(1, "alice", "/my_tasks").await;
    let keyboard = replies[0].keyboard().unwrap();
    let labels: Vec<&str> = keyboard.buttons().map(|b| b.label.as_str()).collect();

    assert!(labels.iter().any(|l| l.contains("fresh done")));
    assert!(labels.iter().any(|l| l.contains("stale progress")));
    assert!(!labels.iter().any(|l| l.contains("old done")));
}

#[tokio::test]
async fn test_cancel_then_fresh_command() {
    let h = Harness::new();
    h.say(1, "alice", "/create_project").await;

    h.say(1, "alice", "/create_task").await;
    h.say(1, "alice", "Fix bug").await;
    let cancelled = h.say(1, "alice", "/cancel@taskbot").await;
    assert!(any_text(&cancelled, "Cancelled task creation"));
    assert!(h.session(1).is_none());

    let status = h.say(1, "alice", "/status").await;
    assert!(any_text(&status, "Running"));
    assert!(h.tasks().await.is_empty());
}

#[tokio::test]
async fn test_active_flow_consumes_commands() {
    let h = Harness::new();
    h.say(1, "alice", "/create_project").await;

    h.say(1, "alice", "/create_task").await;
    h.say(1, "alice", "/status").await;

    match h.session(1) {
        Some(Flow::TaskCreation(draft)) => {
            assert_eq!(draft.title, "/status");
            assert_eq!(draft.step, TaskCreationStep::Description);
        }
        other => panic!("unexpected session: {:?}", other),
    }
}

#[tokio::test]
async fn test_starting_a_flow_replaces_the_previous_one() {
    let h = Harness::new();
    h.say(1, "alice", "/create_project").await;

    h.say(1, "alice", "/create_task").await;
    let replies = h.press(1, "alice", CallbackAction::RenameProject).await;

    assert!(any_text(&replies, "previous task creation was cancelled"));
    assert!(matches!(h.session(1), Some(Flow::ProjectRename { .. })));
}

#[tokio::test]
async fn test_member_cannot_administer() {
    let h = Harness::new();
    h.team().await;
    let project = h.store.fetch_project_by_chat(GROUP).await.unwrap();
    let bob = h.store.fetch_user_by_platform_id(PlatformUserId(2)).await.unwrap();

    for action in [
        CallbackAction::RenameProject,
        CallbackAction::ConfirmDeleteProject,
        CallbackAction::PromoteToManager(bob.id),
        CallbackAction::ProjectTasks,
        CallbackAction::ProjectManagement,
    ] {
        let replies = h.press(2, "bob", action).await;
        assert!(any_text(&replies, "permission"), "{:?} was not denied", action);
        assert!(h.session(2).is_none());
    }

    assert_eq!(h.store.fetch_project(project.id).await.unwrap(), project);
    assert_eq!(h.store.fetch_role(project.id, bob.id).await.unwrap(), Role::Member);
}

#[tokio::test]
async fn test_manager_promotes_and_deletes() {
    let h = Harness::new();
    h.team().await;
    let project = h.store.fetch_project_by_chat(GROUP).await.unwrap();
    let bob = h.store.fetch_user_by_platform_id(PlatformUserId(2)).await.unwrap();

    h.press(1, "alice", CallbackAction::PromoteToManager(bob.id)).await;
    assert_eq!(h.store.fetch_role(project.id, bob.id).await.unwrap(), Role::Manager);

    h.press(2, "bob", CallbackAction::ConfirmDeleteProject).await;
    assert!(h.store.fetch_project_by_chat(GROUP).await.is_err());
}

#[tokio::test]
async fn test_rename_flow() {
    let h = Harness::new();
    h.say(1, "alice", "/create_project").await;

    h.press(1, "alice", CallbackAction::RenameProject).await;
    h.say(1, "alice", "Platform").await;

    assert_eq!(h.store.fetch_project_by_chat(GROUP).await.unwrap().title, "Platform");
    assert!(h.session(1).is_none());
}

#[tokio::test]
async fn test_rename_command() {
    let h = Harness::new();
    h.team().await;

    let denied = h.say(2, "bob", "/rename_project").await;
    assert!(any_text(&denied, "permission"));
    assert!(h.session(2).is_none());

    h.say(1, "alice", "/rename_project@taskbot").await;
    assert!(h.session(1).is_some());
    h.say(1, "alice", "Platform").await;

    assert_eq!(h.store.fetch_project_by_chat(GROUP).await.unwrap().title, "Platform");
    assert!(h.session(1).is_none());
}

#[tokio::test]
async fn test_edit_field_flow() {
    let h = Harness::new();
    h.say(1, "alice", "/create_project").await;
    h.say(1, "alice", "/create_task").await;
    for text in ["Fix bug", "-", "-", "-"] {
        h.say(1, "alice", text).await;
    }
    let task_id = h.tasks().await[0].id;

    h.press(1, "alice", CallbackAction::EditField(task_id, TaskField::Description)).await;
    let replies = h.say(1, "alice", "Steps to reproduce").await;
    assert!(any_text(&replies, "updated"));
    assert!(h.session(1).is_none());
    assert_eq!(h.tasks().await[0].description, "Steps to reproduce");

    h.press(1, "alice", CallbackAction::EditField(task_id, TaskField::Description)).await;
    h.press(1, "alice", CallbackAction::ClearField(task_id, TaskField::Description)).await;
    assert!(h.session(1).is_none());
    assert!(h.tasks().await[0].description().is_none());

    h.press(1, "alice", CallbackAction::SetStatus(task_id, TaskStatus::Done)).await;
    assert_eq!(h.tasks().await[0].status, TaskStatus::Done);
}

#[tokio::test]
async fn test_archived_project_refuses_tasks() {
    let h = Harness::new();
    h.say(1, "alice", "/create_project").await;
    h.press(1, "alice", CallbackAction::ToggleArchive).await;

    let replies = h.say(1, "alice", "/create_task").await;
    assert!(any_text(&replies, "archived"));
    assert!(h.session(1).is_none());
}

#[tokio::test]
async fn test_create_task_requires_project() {
    let h = Harness::new();

    let replies = h.say(1, "alice", "/create_task").await;
    assert!(any_text(&replies, "/start"));
    assert!(h.session(1).is_none());
}

#[tokio::test]
async fn test_allow_list() {
    let h = Harness::with_config(
        BotConfig::new("taskbot").with_allowed_users(vec![PlatformUserId(1)]),
    );

    let denied = h.say(2, "bob", "/start").await;
    assert!(any_text(&denied, "Access denied. Your id: 2"));

    let allowed = h.say(1, "alice", "/start").await;
    assert!(!any_text(&allowed, "Access denied"));
}

#[tokio::test]
async fn test_unrecognized_input() {
    let h = Harness::new();

    assert!(h.say(1, "alice", "just chatting").await.is_empty());
    assert!(h.say(1, "alice", "/weather@otherbot").await.is_empty());
    assert!(any_text(&h.say(1, "alice", "/weather").await, "Unknown command"));

    let private = Event::text(
        Chat {
            id: ChatId(1),
            title: None,
            is_private: true,
        },
        Harness::sender(1, "alice"),
        "hello",
    );
    assert!(any_text(&h.dispatcher.handle(&private).await, "Unknown command"));
}

#[tokio::test]
async fn test_unknown_callback_is_ignored() {
    let h = Harness::new();
    let event = Event::callback(Harness::chat(), Harness::sender(1, "alice"), "bogus_data", 1);

    assert!(h.dispatcher.handle(&event).await.is_empty());
}
