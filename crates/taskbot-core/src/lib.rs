//! Conversation core of Taskbot.
//!
//! Turns transport-neutral [`Event`]s into [`Reply`]s. Long interactions
//! (task creation, field edits, project renaming) are kept as one
//! [`Flow`] per user in a [`SessionStore`]; everything persistent goes
//! through the repository traits of `taskbot-persistence`.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use taskbot_core::{BotConfig, Chat, Dispatcher, Event, Sender};
//! use taskbot_models::{ChatId, PlatformUserId};
//! use taskbot_persistence::MemoryStore;
//!
//! # async fn example() {
//! let dispatcher = Dispatcher::new(Arc::new(MemoryStore::new()), BotConfig::new("taskbot"));
//! let event = Event::text(
//!     Chat { id: ChatId(1), title: None, is_private: true },
//!     Sender { platform_id: PlatformUserId(1), full_name: "Ada".into(), username: None },
//!     "/start",
//! );
//! for reply in dispatcher.handle(&event).await {
//!     println!("{:?}", reply);
//! }
//! # }
//! ```

pub mod assignee;
pub mod auth;
pub mod clock;
pub mod config;
pub mod dates;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod flows;
pub mod identity;
pub mod intent;
pub mod listing;
pub mod reply;
pub mod session;
pub mod views;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::BotConfig;
pub use dispatcher::Dispatcher;
pub use error::{CoreError, Result};
pub use event::{Chat, Event, Payload, Sender};
pub use intent::{CalendarAction, CallbackAction, Command};
pub use reply::{Button, Keyboard, Reply};
pub use session::{Flow, MemorySessionStore, SessionStore, TaskCreationStep, TaskDraft};
