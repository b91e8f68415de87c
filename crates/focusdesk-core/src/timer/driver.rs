//! Async host for [`TimerEngine`].
//!
//! `FocusTimer` is the single owner of the engine. Its commands are plain
//! synchronous methods; ticking and persistence run as tokio tasks.
//!
//! Tick discipline: at most one tick task is live. Every command that
//! touches the tick source aborts the current task and bumps a generation
//! counter before spawning a new one, and a tick whose generation is stale
//! is dropped without touching the engine. This also covers a tick that was
//! already waiting on the state lock when its task was aborted.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::engine::{
    validate_duration, TickDirective, TimerEngine, TimerState, Transition, DEFAULT_DURATION_MIN,
};
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::notify::{Chime, NotificationSink, NullSink, TimerStatus};
use crate::preferences::{MemoryPreferences, PreferenceStore, SoundPreference};
use crate::session::{Identity, SessionStore, SessionWriter, TaskId};

const EVENT_CAPACITY: usize = 256;
const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);

/// Wiring for a [`FocusTimer`].
pub struct FocusTimerBuilder {
    store: Arc<dyn SessionStore>,
    identity: Arc<dyn Identity>,
    notifier: Arc<dyn NotificationSink>,
    preferences: Arc<dyn PreferenceStore>,
    clock: Option<Arc<dyn Clock>>,
    duration_min: u32,
    tick_period: Duration,
}

impl FocusTimerBuilder {
    pub fn new(store: Arc<dyn SessionStore>, identity: Arc<dyn Identity>) -> Self {
        Self {
            store,
            identity,
            notifier: Arc::new(NullSink),
            preferences: Arc::new(MemoryPreferences::new()),
            clock: None,
            duration_min: DEFAULT_DURATION_MIN,
            tick_period: Duration::from_secs(1),
        }
    }

    pub fn notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn preferences(mut self, preferences: Arc<dyn PreferenceStore>) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Initial selected duration, checked by [`build`](Self::build).
    pub fn duration_min(mut self, minutes: u32) -> Self {
        self.duration_min = minutes;
        self
    }

    /// Countdown step. Periods below one millisecond are raised to it.
    pub fn tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period.max(MIN_TICK_PERIOD);
        self
    }

    /// Build the timer on the current tokio runtime.
    ///
    /// # Errors
    /// Returns [`CoreError::Runtime`] when called outside a runtime and
    /// [`CoreError::Validation`] when the initial duration is out of range.
    pub fn build(self) -> Result<FocusTimer> {
        let runtime = Handle::try_current().map_err(|e| CoreError::Runtime(e.to_string()))?;
        validate_duration(self.duration_min)?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()) as Arc<dyn Clock>);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let inner = Arc::new(Inner {
            core: Mutex::new(Core {
                engine: TimerEngine::new(self.duration_min),
                ticker: None,
                tick_generation: 0,
                writer: None,
                retired: Vec::new(),
            }),
            clock,
            store: self.store,
            identity: self.identity,
            notifier: self.notifier,
            sound: SoundPreference::load(self.preferences),
            events,
            runtime,
            tick_period: self.tick_period,
        });
        Ok(FocusTimer { inner })
    }
}

/// The focus timer: engine, tick source and run writer under one owner.
pub struct FocusTimer {
    inner: Arc<Inner>,
}

struct Inner {
    core: Mutex<Core>,
    clock: Arc<dyn Clock>,
    store: Arc<dyn SessionStore>,
    identity: Arc<dyn Identity>,
    notifier: Arc<dyn NotificationSink>,
    sound: SoundPreference,
    events: broadcast::Sender<Event>,
    runtime: Handle,
    tick_period: Duration,
}

struct Core {
    engine: TimerEngine,
    ticker: Option<JoinHandle<()>>,
    tick_generation: u64,
    /// Writer of the current run; `None` while idle.
    writer: Option<SessionWriter>,
    /// Writers of finished runs that may still be draining.
    retired: Vec<JoinHandle<()>>,
}

impl FocusTimer {
    pub fn builder(store: Arc<dyn SessionStore>, identity: Arc<dyn Identity>) -> FocusTimerBuilder {
        FocusTimerBuilder::new(store, identity)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a run (or restart the current countdown).
    pub fn start(&self, duration_min: Option<u32>) {
        let now = self.inner.clock.now_ms();
        let mut core = self.inner.lock();
        if !core.engine.is_active() {
            self.inner.open_writer(&mut core);
        }
        let transition = core.engine.start(duration_min, now);
        info!(
            run_id = core.engine.run_id(),
            duration_min = core.engine.selected_duration_min(),
            "focus run started"
        );
        self.inner.apply(&mut core, transition);
    }

    /// Returns false when the timer was not running.
    pub fn pause(&self) -> bool {
        let now = self.inner.clock.now_ms();
        let mut core = self.inner.lock();
        match core.engine.pause(now) {
            Some(transition) => {
                self.inner.apply(&mut core, transition);
                true
            }
            None => false,
        }
    }

    /// Returns false when the timer was not paused.
    pub fn resume(&self) -> bool {
        let now = self.inner.clock.now_ms();
        let mut core = self.inner.lock();
        match core.engine.resume(now) {
            Some(transition) => {
                self.inner.apply(&mut core, transition);
                true
            }
            None => false,
        }
    }

    /// Stop the run early. An active run is saved as not completed.
    pub fn reset(&self) {
        let now = self.inner.clock.now_ms();
        let mut core = self.inner.lock();
        let transition = core.engine.reset(now);
        if let Event::TimerReset {
            interrupted: true,
            actual_duration_min,
            ..
        } = &transition.event
        {
            info!(actual_duration_min, "focus run interrupted");
        }
        self.inner.apply(&mut core, transition);
    }

    /// Returns false (and changes nothing) for durations outside 1..=180.
    pub fn set_duration(&self, minutes: u32) -> bool {
        let mut core = self.inner.lock();
        match core.engine.set_duration(minutes) {
            Ok(()) => {
                self.inner.notifier.reflect_status(&core.engine.status());
                let _ = self.inner.events.send(Event::DurationChanged {
                    duration_min: minutes,
                });
                true
            }
            Err(e) => {
                debug!("rejected duration: {e}");
                false
            }
        }
    }

    pub fn set_current_tasks<I>(&self, task_ids: I)
    where
        I: IntoIterator<Item = TaskId>,
    {
        self.inner.lock().engine.set_task_ids(task_ids);
    }

    pub fn set_notes(&self, notes: impl Into<String>) {
        self.inner.lock().engine.set_notes(notes);
    }

    /// Flip the completion-sound preference and return the new value.
    pub fn toggle_sound_preference(&self) -> bool {
        self.inner.sound.toggle()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn sound_enabled(&self) -> bool {
        self.inner.sound.enabled()
    }

    pub fn state(&self) -> TimerState {
        self.inner.lock().engine.state()
    }

    pub fn status(&self) -> TimerStatus {
        self.inner.lock().engine.status()
    }

    pub fn snapshot(&self) -> Event {
        let now = self.inner.clock.now_ms();
        self.inner.lock().engine.snapshot(now)
    }

    /// Read the engine under the state lock.
    pub fn inspect<R>(&self, f: impl FnOnce(&TimerEngine) -> R) -> R {
        f(&self.inner.lock().engine)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.events.subscribe()
    }

    /// Wait until every save issued so far has been attempted.
    pub async fn flush(&self) {
        let (pending, retired) = {
            let mut core = self.inner.lock();
            let pending = core.writer.as_ref().map(|w| w.flush_signal());
            (pending, std::mem::take(&mut core.retired))
        };
        for handle in retired {
            let _ = handle.await;
        }
        if let Some(pending) = pending {
            let _ = pending.await;
        }
    }
}

impl Drop for FocusTimer {
    fn drop(&mut self) {
        let mut core = self.inner.lock();
        if let Some(ticker) = core.ticker.take() {
            ticker.abort();
        }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn open_writer(self: &Arc<Self>, core: &mut Core) {
        if let Some(old) = core.writer.take() {
            core.retired.push(old.retire());
        }
        let weak = Arc::downgrade(self);
        core.writer = Some(SessionWriter::spawn(
            &self.runtime,
            Arc::clone(&self.store),
            Arc::clone(&self.identity),
            Box::new(move |run_id, session_id| {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let recorded = inner.lock().engine.record_persisted(run_id, session_id.clone());
                if recorded {
                    let _ = inner.events.send(Event::SessionPersisted {
                        run_id,
                        session_id: session_id.to_string(),
                    });
                }
            }),
        ));
    }

    /// Carry out a transition's effects. Returns true on completion.
    fn apply(self: &Arc<Self>, core: &mut Core, transition: Transition) -> bool {
        match transition.tick {
            TickDirective::Start => {
                self.stop_ticker(core);
                self.start_ticker(core);
            }
            TickDirective::Stop => self.stop_ticker(core),
            TickDirective::Keep => {}
        }

        if let Some(save) = transition.save.clone() {
            match &core.writer {
                Some(writer) => writer.submit(save),
                None => warn!(run_id = save.run_id, "no session writer for run; save dropped"),
            }
        }

        if !core.engine.is_active() {
            if let Some(writer) = core.writer.take() {
                core.retired.retain(|h| !h.is_finished());
                core.retired.push(writer.retire());
            }
        }

        self.notifier.reflect_status(&core.engine.status());
        let completed = transition.is_completion();
        let _ = self.events.send(transition.event);
        completed
    }

    fn stop_ticker(&self, core: &mut Core) {
        if let Some(ticker) = core.ticker.take() {
            ticker.abort();
        }
        core.tick_generation = core.tick_generation.wrapping_add(1);
    }

    fn start_ticker(self: &Arc<Self>, core: &mut Core) {
        let generation = core.tick_generation;
        let weak: Weak<Inner> = Arc::downgrade(self);
        let period = self.tick_period;
        core.ticker = Some(self.runtime.spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                interval.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                if !inner.on_tick(generation) {
                    break;
                }
            }
        }));
    }

    /// Returns false when this tick source should stop.
    fn on_tick(self: &Arc<Self>, generation: u64) -> bool {
        let now = self.clock.now_ms();
        let completed = {
            let mut core = self.lock();
            if core.tick_generation != generation {
                return false;
            }
            let Some(transition) = core.engine.tick(now) else {
                return false;
            };
            self.apply(&mut core, transition)
        };

        if completed {
            info!("focus run completed");
            self.signal_completion();
            return false;
        }
        true
    }

    fn signal_completion(&self) {
        let chime = Chime::completion();
        let audible = self.sound.enabled().then_some(&chime);
        if let Err(e) = self.notifier.signal_completion(audible) {
            warn!("completion signal failed: {e}");
        }
    }
}
