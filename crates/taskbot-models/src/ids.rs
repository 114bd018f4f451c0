//! Type-safe ID wrappers for Taskbot.
//!
//! Internal identifiers are assigned by the store; platform identifiers come
//! from the chat transport. Keeping them as distinct newtypes stops a
//! platform user id from being passed where an internal user id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Macro to generate integer ID newtypes with common functionality.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Returns the raw integer value.
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(v: i64) -> Self {
                Self(v)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<i64>().map(Self)
            }
        }
    };
}

define_id!(
    /// Internal project identifier.
    ProjectId
);
define_id!(
    /// Internal user identifier.
    UserId
);
define_id!(
    /// Internal task identifier.
    TaskId
);
define_id!(
    /// Chat identifier on the messaging platform.
    ChatId
);
define_id!(
    /// User identifier on the messaging platform.
    PlatformUserId
);
