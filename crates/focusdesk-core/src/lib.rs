//! # Focusdesk Core Library
//!
//! Focus-session timer and session accounting. The CLI binary is a thin
//! shell over this crate: every operation is reachable as a library call.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A pure Idle/Running/Paused state machine. Every
//!   operation takes the current time, so it never reads a clock itself
//! - **Driver**: [`FocusTimer`] owns the engine, the single tick source and
//!   the per-run session writer on a tokio runtime
//! - **Storage**: SQLite or hosted-service session stores, TOML configuration
//! - **Notifications**: Completion chime and status title, gated by the
//!   durable sound preference
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`FocusTimer`]: Async host wiring engine, ticks and persistence
//! - [`SessionStore`]: Insert/update/link contract for focus sessions
//! - [`Database`]: Local session and preference persistence
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod notify;
pub mod preferences;
pub mod session;
pub mod storage;
pub mod timer;

pub use error::{
    ConfigError, CoreError, DatabaseError, NotifyError, PersistenceError, ValidationError,
};
pub use events::Event;
pub use notify::{Chime, NotificationSink, TimerStatus};
pub use preferences::{PreferenceStore, SoundPreference, SOUND_PREFERENCE_KEY};
pub use session::{Identity, SessionId, SessionStore, StaticIdentity, TaskId, UserId};
pub use storage::{Config, Database, LocalStore, RemoteStore};
pub use timer::{FocusTimer, FocusTimerBuilder, TimerEngine, TimerState};
