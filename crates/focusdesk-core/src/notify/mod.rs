//! Completion signal and ambient status surface.
//!
//! Sinks are best-effort: the driver logs a failed signal and carries on.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::error::NotifyError;

/// One tone of the completion chime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    pub frequency_hz: f32,
    /// Offset from the start of the chime.
    pub offset_ms: u32,
    pub duration_ms: u32,
}

/// A fixed tone sequence played when a run completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chime {
    pub tones: Vec<Tone>,
}

impl Chime {
    /// Rising C-E-G triad, 150 ms per note.
    pub fn completion() -> Self {
        const NOTES: [f32; 3] = [523.25, 659.25, 783.99];
        Self {
            tones: NOTES
                .iter()
                .enumerate()
                .map(|(i, &frequency_hz)| Tone {
                    frequency_hz,
                    offset_ms: i as u32 * 150,
                    duration_ms: 150,
                })
                .collect(),
        }
    }

    pub fn total_ms(&self) -> u32 {
        self.tones
            .iter()
            .map(|t| t.offset_ms + t.duration_ms)
            .max()
            .unwrap_or(0)
    }
}

/// What an ambient status surface (window title, tray, prompt) should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerStatus {
    pub active: bool,
    pub paused: bool,
    pub remaining_min: u32,
    pub remaining_sec: u32,
}

impl TimerStatus {
    pub fn clock(&self) -> String {
        format!("{:02}:{:02}", self.remaining_min, self.remaining_sec)
    }

    pub fn title(&self) -> String {
        match (self.active, self.paused) {
            (false, _) => "Focus Timer".to_string(),
            (true, false) => format!("{} - Focus", self.clock()),
            (true, true) => format!("Paused {} - Focus", self.clock()),
        }
    }
}

/// Receives completion signals and status updates.
pub trait NotificationSink: Send + Sync {
    /// A run reached 00:00. `chime` is `None` when sound is turned off.
    fn signal_completion(&self, chime: Option<&Chime>) -> Result<(), NotifyError>;

    fn reflect_status(&self, status: &TimerStatus);
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn signal_completion(&self, _chime: Option<&Chime>) -> Result<(), NotifyError> {
        Ok(())
    }

    fn reflect_status(&self, _status: &TimerStatus) {}
}

/// Sink that remembers what it was told. Useful in tests and headless hosts.
#[derive(Debug, Default)]
pub struct RecordingSink {
    completions: Mutex<u32>,
    chimes: Mutex<u32>,
    titles: Mutex<Vec<String>>,
    fail_signal: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose completion signal always fails.
    pub fn failing() -> Self {
        Self {
            fail_signal: true,
            ..Self::default()
        }
    }

    pub fn completion_count(&self) -> u32 {
        self.completions.lock().map(|c| *c).unwrap_or(0)
    }

    /// Completions that carried an audible chime.
    pub fn chime_count(&self) -> u32 {
        self.chimes.lock().map(|c| *c).unwrap_or(0)
    }

    pub fn titles(&self) -> Vec<String> {
        self.titles.lock().map(|t| t.clone()).unwrap_or_default()
    }

    pub fn last_title(&self) -> Option<String> {
        self.titles().last().cloned()
    }
}

impl NotificationSink for RecordingSink {
    fn signal_completion(&self, chime: Option<&Chime>) -> Result<(), NotifyError> {
        if let Ok(mut count) = self.completions.lock() {
            *count += 1;
        }
        if chime.is_some() {
            if let Ok(mut count) = self.chimes.lock() {
                *count += 1;
            }
        }
        if self.fail_signal {
            return Err(NotifyError::Unavailable("no audio device".into()));
        }
        Ok(())
    }

    fn reflect_status(&self, status: &TimerStatus) {
        if let Ok(mut titles) = self.titles.lock() {
            titles.push(status.title());
        }
    }
}
