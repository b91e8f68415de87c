//! Focus-session persistence contract.
//!
//! The timer only ever inserts and updates two kinds of rows: the focus
//! session itself and its task links. Stores implement [`SessionStore`];
//! the per-run [`SessionWriter`] decides which call to make.

mod memory;
mod writer;

pub use memory::{MemoryStore, StoreCall};
pub use writer::SessionWriter;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PersistenceError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identity of a persisted focus-session row.
    SessionId
);
string_id!(
    /// Authenticated account owning the rows.
    UserId
);
string_id!(
    /// A task the user focuses on during a run.
    TaskId
);

/// Insert payload for `focus_sessions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSession {
    pub user_id: UserId,
    /// Nominal duration in minutes.
    pub duration: u32,
    /// Minutes actually spent counting down.
    pub actual_duration: u32,
    pub completed: bool,
    pub notes: String,
}

/// Fields rewritten on every save after the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUpdate {
    pub completed: bool,
    pub actual_duration: u32,
    pub notes: String,
}

/// One save emitted by the engine for the run identified by `run_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub run_id: u64,
    pub nominal_duration_min: u32,
    pub actual_duration_min: u32,
    pub completed: bool,
    pub notes: String,
    pub task_ids: Vec<TaskId>,
}

impl SaveRequest {
    pub fn to_new_session(&self, user_id: UserId) -> NewSession {
        NewSession {
            user_id,
            duration: self.nominal_duration_min,
            actual_duration: self.actual_duration_min,
            completed: self.completed,
            notes: self.notes.clone(),
        }
    }

    pub fn to_update(&self) -> SessionUpdate {
        SessionUpdate {
            completed: self.completed,
            actual_duration: self.actual_duration_min,
            notes: self.notes.clone(),
        }
    }
}

/// Durable storage for focus sessions.
///
/// Implementations hold no timer logic. Every method is a single write.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a session row and return its generated id.
    async fn create_session(&self, session: &NewSession) -> Result<SessionId, PersistenceError>;

    /// Rewrite the mutable fields of an existing row.
    async fn update_session(
        &self,
        id: &SessionId,
        update: &SessionUpdate,
    ) -> Result<(), PersistenceError>;

    /// Bulk-insert `(session_id, task_id)` links.
    async fn link_tasks(
        &self,
        session_id: &SessionId,
        task_ids: &[TaskId],
    ) -> Result<(), PersistenceError>;
}

/// Source of the signed-in account. `None` means saves are skipped.
pub trait Identity: Send + Sync {
    fn current_user(&self) -> Option<UserId>;
}

/// Fixed identity, typically read from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<UserId>);

impl StaticIdentity {
    pub fn new(user: impl Into<UserId>) -> Self {
        Self(Some(user.into()))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }

    /// Empty strings count as signed out.
    pub fn from_config(user_id: &str) -> Self {
        let trimmed = user_id.trim();
        if trimmed.is_empty() {
            Self::anonymous()
        } else {
            Self::new(trimmed)
        }
    }
}

impl Identity for StaticIdentity {
    fn current_user(&self) -> Option<UserId> {
        self.0.clone()
    }
}
