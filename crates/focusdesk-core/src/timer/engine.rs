//! Focus timer engine.
//!
//! The engine is a pure state machine. It owns no tick source and reads no
//! clock: every command receives the current epoch-millisecond reading, and
//! the returned [`Transition`] tells the host what to persist and whether to
//! start or stop ticking.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//! Running | Paused -> Idle   (reset, saved as interrupted)
//! Running -> Idle            (countdown reaches 00:00, saved as completed)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(25);
//! let t = engine.start(None, now_ms);
//! // once per second while running:
//! engine.tick(now_ms);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use super::accounting;
use crate::error::ValidationError;
use crate::events::Event;
use crate::notify::TimerStatus;
use crate::session::{SaveRequest, SessionId, TaskId};

pub const MIN_DURATION_MIN: u32 = 1;
pub const MAX_DURATION_MIN: u32 = 180;
pub const DEFAULT_DURATION_MIN: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
}

/// What the host must do with its tick source after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDirective {
    /// Cancel any live tick source and start a fresh one.
    Start,
    /// Cancel the live tick source.
    Stop,
    /// Leave the tick source alone.
    Keep,
}

/// Result of a command or tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub event: Event,
    pub save: Option<SaveRequest>,
    pub tick: TickDirective,
}

impl Transition {
    /// True when this transition ended the run by reaching 00:00.
    pub fn is_completion(&self) -> bool {
        matches!(self.event, Event::TimerCompleted { .. })
    }
}

pub fn validate_duration(minutes: u32) -> Result<u32, ValidationError> {
    if (MIN_DURATION_MIN..=MAX_DURATION_MIN).contains(&minutes) {
        Ok(minutes)
    } else {
        Err(ValidationError::DurationOutOfRange {
            minutes,
            min: MIN_DURATION_MIN,
            max: MAX_DURATION_MIN,
        })
    }
}

/// Core focus timer state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerEngine {
    selected_duration_min: u32,
    remaining_min: u32,
    remaining_sec: u32,
    state: TimerState,
    /// Set once per run, cleared when the run ends.
    session_start_ms: Option<u64>,
    /// Closed pauses only; the open one lives in `last_pause_ms`.
    total_paused_ms: u64,
    /// Non-null iff paused.
    last_pause_ms: Option<u64>,
    task_ids: BTreeSet<TaskId>,
    notes: String,
    session_id: Option<SessionId>,
    /// Monotonic run counter; 0 before the first run.
    run_id: u64,
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION_MIN)
    }
}

impl TimerEngine {
    /// Create an idle engine. Out-of-range durations fall back to the default.
    pub fn new(duration_min: u32) -> Self {
        let selected = validate_duration(duration_min).unwrap_or(DEFAULT_DURATION_MIN);
        Self {
            selected_duration_min: selected,
            remaining_min: selected,
            remaining_sec: 0,
            state: TimerState::Idle,
            session_start_ms: None,
            total_paused_ms: 0,
            last_pause_ms: None,
            task_ids: BTreeSet::new(),
            notes: String::new(),
            session_id: None,
            run_id: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != TimerState::Idle
    }

    pub fn is_paused(&self) -> bool {
        self.state == TimerState::Paused
    }

    pub fn selected_duration_min(&self) -> u32 {
        self.selected_duration_min
    }

    /// `(minutes, seconds)` left on the countdown.
    pub fn remaining(&self) -> (u32, u32) {
        (self.remaining_min, self.remaining_sec)
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_min * 60 + self.remaining_sec
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn session_start_ms(&self) -> Option<u64> {
        self.session_start_ms
    }

    pub fn total_paused_ms(&self) -> u64 {
        self.total_paused_ms
    }

    pub fn last_pause_ms(&self) -> Option<u64> {
        self.last_pause_ms
    }

    pub fn task_ids(&self) -> impl Iterator<Item = &TaskId> {
        self.task_ids.iter()
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// Active (non-paused) milliseconds of the current run at `now_ms`.
    pub fn active_ms(&self, now_ms: u64) -> u64 {
        match self.session_start_ms {
            Some(start) => accounting::active_ms(
                start,
                now_ms,
                self.total_paused_ms,
                self.last_pause_ms,
            ),
            None => 0,
        }
    }

    pub fn status(&self) -> TimerStatus {
        TimerStatus {
            active: self.is_active(),
            paused: self.is_paused(),
            remaining_min: self.remaining_min,
            remaining_sec: self.remaining_sec,
        }
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self, now_ms: u64) -> Event {
        Event::StateSnapshot {
            state: self.state,
            selected_duration_min: self.selected_duration_min,
            remaining_min: self.remaining_min,
            remaining_sec: self.remaining_sec,
            task_ids: self.task_ids.iter().map(|t| t.to_string()).collect(),
            notes: self.notes.clone(),
            session_id: self.session_id.as_ref().map(|s| s.to_string()),
            at: at(now_ms),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a run, or restart the countdown of the current one.
    ///
    /// An out-of-range `duration_min` is ignored and the previously selected
    /// duration is used. Restarting keeps the run (and its persisted row).
    pub fn start(&mut self, duration_min: Option<u32>, now_ms: u64) -> Transition {
        if let Some(minutes) = duration_min {
            match validate_duration(minutes) {
                Ok(minutes) => self.selected_duration_min = minutes,
                Err(e) => debug!("ignoring start duration: {e}"),
            }
        }
        if self.state == TimerState::Idle {
            self.run_id += 1;
            self.session_id = None;
        }

        self.remaining_min = self.selected_duration_min;
        self.remaining_sec = 0;
        self.state = TimerState::Running;
        self.session_start_ms = Some(now_ms);
        self.total_paused_ms = 0;
        self.last_pause_ms = None;

        Transition {
            event: Event::TimerStarted {
                run_id: self.run_id,
                duration_min: self.selected_duration_min,
                at: at(now_ms),
            },
            save: Some(self.save_request(false, 0)),
            tick: TickDirective::Start,
        }
    }

    pub fn pause(&mut self, now_ms: u64) -> Option<Transition> {
        if self.state != TimerState::Running {
            return None;
        }
        self.state = TimerState::Paused;
        self.last_pause_ms = Some(now_ms);
        Some(Transition {
            event: Event::TimerPaused {
                remaining_secs: self.remaining_secs(),
                at: at(now_ms),
            },
            save: None,
            tick: TickDirective::Stop,
        })
    }

    pub fn resume(&mut self, now_ms: u64) -> Option<Transition> {
        if self.state != TimerState::Paused {
            return None;
        }
        let since = self.last_pause_ms.take()?;
        let paused_ms = now_ms.saturating_sub(since);
        self.total_paused_ms = self.total_paused_ms.saturating_add(paused_ms);
        self.state = TimerState::Running;
        Some(Transition {
            event: Event::TimerResumed {
                remaining_secs: self.remaining_secs(),
                paused_ms,
                at: at(now_ms),
            },
            save: None,
            tick: TickDirective::Start,
        })
    }

    /// Abandon the current run (if any) and restore the full countdown.
    ///
    /// An active run is saved as not completed, credited with its active
    /// minutes only.
    pub fn reset(&mut self, now_ms: u64) -> Transition {
        let save = match (self.is_active(), self.session_start_ms) {
            (true, Some(start)) => {
                let minutes = accounting::interrupted_minutes(
                    start,
                    now_ms,
                    self.total_paused_ms,
                    self.last_pause_ms,
                );
                Some(self.save_request(false, minutes))
            }
            _ => None,
        };

        self.state = TimerState::Idle;
        self.clear_run();
        self.remaining_min = self.selected_duration_min;
        self.remaining_sec = 0;

        Transition {
            event: Event::TimerReset {
                interrupted: save.is_some(),
                actual_duration_min: save.as_ref().map(|s| s.actual_duration_min).unwrap_or(0),
                at: at(now_ms),
            },
            save,
            tick: TickDirective::Stop,
        }
    }

    /// Advance the countdown by one second. Only meaningful while running.
    ///
    /// The tick that brings the countdown to 00:00 completes the run.
    pub fn tick(&mut self, now_ms: u64) -> Option<Transition> {
        if self.state != TimerState::Running {
            return None;
        }

        if self.remaining_sec > 0 {
            self.remaining_sec -= 1;
        } else if self.remaining_min > 0 {
            self.remaining_min -= 1;
            self.remaining_sec = 59;
        }

        if self.remaining_min == 0 && self.remaining_sec == 0 {
            return Some(self.complete(now_ms));
        }

        Some(Transition {
            event: Event::TimerTicked {
                remaining_min: self.remaining_min,
                remaining_sec: self.remaining_sec,
            },
            save: None,
            tick: TickDirective::Keep,
        })
    }

    /// Choose the nominal duration. The countdown display only follows
    /// while idle; during a run the value applies to the next one.
    pub fn set_duration(&mut self, minutes: u32) -> Result<(), ValidationError> {
        let minutes = validate_duration(minutes)?;
        self.selected_duration_min = minutes;
        if self.state == TimerState::Idle {
            self.remaining_min = minutes;
            self.remaining_sec = 0;
        }
        Ok(())
    }

    pub fn set_task_ids<I>(&mut self, task_ids: I)
    where
        I: IntoIterator<Item = TaskId>,
    {
        self.task_ids = task_ids.into_iter().collect();
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    /// Remember the row created for `run_id`. Ignored once that run ended.
    pub fn record_persisted(&mut self, run_id: u64, session_id: SessionId) -> bool {
        if run_id != self.run_id || !self.is_active() {
            return false;
        }
        self.session_id = Some(session_id);
        true
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn complete(&mut self, now_ms: u64) -> Transition {
        // A completed run is credited with its full nominal duration.
        let save = self.save_request(true, self.selected_duration_min);
        self.state = TimerState::Idle;
        self.clear_run();
        Transition {
            event: Event::TimerCompleted {
                run_id: self.run_id,
                duration_min: save.nominal_duration_min,
                at: at(now_ms),
            },
            save: Some(save),
            tick: TickDirective::Stop,
        }
    }

    fn clear_run(&mut self) {
        self.session_start_ms = None;
        self.total_paused_ms = 0;
        self.last_pause_ms = None;
        self.session_id = None;
    }

    fn save_request(&self, completed: bool, actual_duration_min: u32) -> SaveRequest {
        SaveRequest {
            run_id: self.run_id,
            nominal_duration_min: self.selected_duration_min,
            actual_duration_min,
            completed,
            notes: self.notes.clone(),
            task_ids: self.task_ids.iter().cloned().collect(),
        }
    }
}

fn at(now_ms: u64) -> DateTime<Utc> {
    i64::try_from(now_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_else(Utc::now)
}
