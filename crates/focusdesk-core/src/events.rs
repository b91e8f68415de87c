use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::TimerState;

/// Every state change of the focus timer produces an Event.
/// Hosts subscribe to them to render status and react to completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        run_id: u64,
        duration_min: u32,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_secs: u32,
        /// Length of the pause that just ended.
        paused_ms: u64,
        at: DateTime<Utc>,
    },
    TimerTicked {
        remaining_min: u32,
        remaining_sec: u32,
    },
    TimerCompleted {
        run_id: u64,
        duration_min: u32,
        at: DateTime<Utc>,
    },
    TimerReset {
        /// Whether a run was in progress (and therefore saved as interrupted).
        interrupted: bool,
        actual_duration_min: u32,
        at: DateTime<Utc>,
    },
    DurationChanged {
        duration_min: u32,
    },
    SessionPersisted {
        run_id: u64,
        session_id: String,
    },
    StateSnapshot {
        state: TimerState,
        selected_duration_min: u32,
        remaining_min: u32,
        remaining_sec: u32,
        task_ids: Vec<String>,
        notes: String,
        session_id: Option<String>,
        at: DateTime<Utc>,
    },
}
