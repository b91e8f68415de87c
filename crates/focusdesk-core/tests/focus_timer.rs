//! End-to-end runs of the focus timer on a paused tokio clock.
//!
//! Time only moves when the test sleeps, so every tick count below is exact.

use std::sync::Arc;
use std::time::Duration;

use focusdesk_core::preferences::{MemoryPreferences, PreferenceStore, SOUND_PREFERENCE_KEY};
use focusdesk_core::session::{MemoryStore, StoreCall};
use focusdesk_core::notify::RecordingSink;
use focusdesk_core::timer::ManualClock;
use focusdesk_core::{
    CoreError, Event, FocusTimer, SessionId, StaticIdentity, TaskId, TimerState, ValidationError,
};

struct Harness {
    timer: FocusTimer,
    store: Arc<MemoryStore>,
    sink: Arc<RecordingSink>,
}

fn harness_with(identity: StaticIdentity, preferences: Arc<MemoryPreferences>) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let sink = Arc::new(RecordingSink::new());
    let timer = FocusTimer::builder(Arc::<MemoryStore>::clone(&store), Arc::new(identity))
        .notifier(Arc::<RecordingSink>::clone(&sink))
        .preferences(preferences)
        .build()
        .unwrap();
    Harness { timer, store, sink }
}

fn harness() -> Harness {
    harness_with(
        StaticIdentity::new("user-1"),
        Arc::new(MemoryPreferences::new()),
    )
}

async fn advance_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn full_run_is_saved_as_completed_with_nominal_minutes() {
    let h = harness();
    h.timer.start(None);
    assert_eq!(h.timer.state(), TimerState::Running);

    advance_ms(25 * 60 * 1000 + 500).await;
    h.timer.flush().await;

    assert_eq!(h.timer.state(), TimerState::Idle);
    assert_eq!(h.store.insert_count(), 1);
    let (_, row) = h.store.single_row().unwrap();
    assert!(row.completed);
    assert_eq!(row.duration, 25);
    assert_eq!(row.actual_duration, 25);
    assert_eq!(h.sink.completion_count(), 1);
    assert_eq!(h.sink.chime_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn interrupted_run_excludes_paused_time() {
    let h = harness();
    h.timer.start(Some(10));
    advance_ms(120_500).await;
    assert!(h.timer.pause());
    advance_ms(300_000).await;
    assert!(h.timer.resume());
    advance_ms(60_200).await;
    h.timer.reset();
    h.timer.flush().await;

    assert_eq!(h.store.insert_count(), 1);
    assert_eq!(h.store.update_count(), 1);
    let (_, row) = h.store.single_row().unwrap();
    assert!(!row.completed);
    assert_eq!(row.duration, 10);
    assert_eq!(row.actual_duration, 3);
    assert_eq!(h.sink.completion_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn reset_while_paused_counts_open_pause_as_inactive() {
    let h = harness();
    h.timer.start(Some(10));
    advance_ms(150_000).await;
    h.timer.pause();
    advance_ms(600_000).await;
    h.timer.reset();
    h.timer.flush().await;

    let (_, row) = h.store.single_row().unwrap();
    assert_eq!(row.actual_duration, 2);
}

#[tokio::test(start_paused = true)]
async fn restarting_does_not_double_the_tick_rate() {
    let h = harness();
    h.timer.start(None);
    advance_ms(500).await;
    h.timer.start(None);
    advance_ms(10_200).await;

    assert_eq!(h.timer.inspect(|e| e.remaining()), (24, 50));
    h.timer.flush().await;
    assert_eq!(h.store.insert_count(), 1);
    assert_eq!(h.store.update_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn pause_freezes_the_countdown() {
    let h = harness();
    h.timer.start(Some(5));
    advance_ms(3_500).await;
    assert!(h.timer.pause());
    assert!(!h.timer.pause());
    advance_ms(100_000).await;

    assert_eq!(h.timer.inspect(|e| e.remaining()), (4, 57));
    assert!(h.timer.resume());
    advance_ms(1_100).await;
    assert_eq!(h.timer.inspect(|e| e.remaining()), (4, 56));
}

#[tokio::test(start_paused = true)]
async fn failing_store_does_not_halt_the_countdown() {
    let h = harness();
    h.store.set_failing(true);
    h.timer.start(Some(1));
    advance_ms(30_500).await;
    assert_eq!(h.timer.inspect(|e| e.remaining()), (0, 30));

    advance_ms(30_000).await;
    h.timer.flush().await;
    assert_eq!(h.timer.state(), TimerState::Idle);
    assert_eq!(h.sink.completion_count(), 1);
    assert!(h.store.single_row().is_none());
}

#[tokio::test(start_paused = true)]
async fn signed_out_user_runs_without_writes() {
    let h = harness_with(
        StaticIdentity::anonymous(),
        Arc::new(MemoryPreferences::new()),
    );
    h.timer.start(Some(1));
    advance_ms(60_500).await;
    h.timer.flush().await;

    assert_eq!(h.timer.state(), TimerState::Idle);
    assert!(h.store.calls().is_empty());
    assert_eq!(h.sink.completion_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn muted_sound_completes_silently() {
    let prefs = Arc::new(MemoryPreferences::new());
    prefs.set_bool(SOUND_PREFERENCE_KEY, false).unwrap();
    let h = harness_with(StaticIdentity::new("user-1"), prefs);
    assert!(!h.timer.sound_enabled());

    h.timer.start(Some(1));
    advance_ms(60_500).await;

    assert_eq!(h.sink.completion_count(), 1);
    assert_eq!(h.sink.chime_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn sound_toggle_is_written_through() {
    let prefs = Arc::new(MemoryPreferences::new());
    let h = harness_with(StaticIdentity::new("user-1"), Arc::clone(&prefs));
    assert!(h.timer.sound_enabled());

    assert!(!h.timer.toggle_sound_preference());
    assert_eq!(prefs.get_bool(SOUND_PREFERENCE_KEY).unwrap(), Some(false));
    assert!(h.timer.toggle_sound_preference());
    assert_eq!(prefs.get_bool(SOUND_PREFERENCE_KEY).unwrap(), Some(true));
}

#[tokio::test(start_paused = true)]
async fn out_of_range_duration_is_rejected() {
    let h = harness();
    assert!(!h.timer.set_duration(200));
    assert!(!h.timer.set_duration(0));
    assert_eq!(h.timer.inspect(|e| e.selected_duration_min()), 25);

    assert!(h.timer.set_duration(180));
    assert_eq!(h.timer.inspect(|e| e.remaining()), (180, 0));
}

#[tokio::test(start_paused = true)]
async fn persisted_id_is_tracked_until_reset() {
    let h = harness();
    let mut events = h.timer.subscribe();
    h.timer.start(Some(5));
    h.timer.flush().await;

    let (row_id, _) = h.store.single_row().unwrap();
    assert_eq!(h.timer.inspect(|e| e.session_id().cloned()), Some(row_id.clone()));

    let mut persisted = None;
    while let Ok(event) = events.try_recv() {
        if let Event::SessionPersisted { session_id, .. } = event {
            persisted = Some(session_id);
        }
    }
    assert_eq!(persisted.as_deref(), Some(row_id.as_str()));

    h.timer.reset();
    assert!(h.timer.inspect(|e| e.session_id().is_none()));
}

#[tokio::test(start_paused = true)]
async fn tasks_are_linked_once_per_run() {
    let h = harness();
    h.timer
        .set_current_tasks([TaskId::from("task-b"), TaskId::from("task-a")]);
    h.timer.set_notes("reading");
    h.timer.start(Some(2));
    advance_ms(10_500).await;
    h.timer.pause();
    h.timer.resume();
    advance_ms(60_000).await;
    h.timer.reset();
    h.timer.flush().await;

    let links: Vec<_> = h
        .store
        .calls()
        .into_iter()
        .filter(|c| matches!(c, StoreCall::Link(..)))
        .collect();
    assert_eq!(links.len(), 1);

    let (row_id, row) = h.store.single_row().unwrap();
    assert_eq!(row.notes, "reading");
    assert_eq!(row.actual_duration, 1);
    assert_eq!(
        h.store.linked_tasks(&row_id),
        vec![TaskId::from("task-a"), TaskId::from("task-b")]
    );
}

#[tokio::test(start_paused = true)]
async fn slow_write_from_previous_run_lands_on_its_own_row() {
    let h = harness();
    h.store.set_latency(Some(Duration::from_secs(5)));

    h.timer.start(Some(3));
    advance_ms(1_200).await;
    h.timer.reset();
    advance_ms(100).await;
    h.timer.start(Some(3));
    h.timer.flush().await;

    assert_eq!(h.store.insert_count(), 2);
    let first = SessionId::from("session-1");
    let second = SessionId::from("session-2");
    assert!(h.store.calls().iter().any(|c| matches!(
        c,
        StoreCall::Update(id, update) if *id == first && !update.completed
    )));
    assert_eq!(h.timer.inspect(|e| e.session_id().cloned()), Some(second));
    assert_eq!(h.timer.state(), TimerState::Running);
}

#[tokio::test(start_paused = true)]
async fn status_title_follows_the_timer() {
    let h = harness();
    h.timer.start(Some(25));
    assert_eq!(h.sink.last_title().as_deref(), Some("25:00 - Focus"));

    advance_ms(1_100).await;
    assert_eq!(h.sink.last_title().as_deref(), Some("24:59 - Focus"));

    h.timer.pause();
    assert_eq!(h.sink.last_title().as_deref(), Some("Paused 24:59 - Focus"));

    h.timer.reset();
    assert_eq!(h.sink.last_title().as_deref(), Some("Focus Timer"));
}

#[tokio::test(start_paused = true)]
async fn completed_display_stays_at_zero() {
    let h = harness();
    h.timer.start(Some(1));
    advance_ms(90_000).await;

    assert_eq!(h.timer.state(), TimerState::Idle);
    assert_eq!(h.timer.inspect(|e| e.remaining()), (0, 0));
}

#[tokio::test(start_paused = true)]
async fn accounting_reads_the_injected_clock() {
    let clock = ManualClock::new(1_700_000_000_000);
    let store = Arc::new(MemoryStore::new());
    let timer = FocusTimer::builder(Arc::<MemoryStore>::clone(&store), Arc::new(StaticIdentity::new("user-1")))
        .clock(Arc::new(clock.clone()))
        .build()
        .unwrap();

    timer.start(Some(30));
    clock.advance_secs(7 * 60 + 59);
    timer.reset();
    timer.flush().await;

    let (_, row) = store.single_row().unwrap();
    assert_eq!(row.actual_duration, 7);
}

#[tokio::test(start_paused = true)]
async fn zero_tick_period_still_counts_down() {
    let store = Arc::new(MemoryStore::new());
    let timer = FocusTimer::builder(Arc::<MemoryStore>::clone(&store), Arc::new(StaticIdentity::new("user-1")))
        .tick_period(Duration::ZERO)
        .build()
        .unwrap();

    timer.start(Some(1));
    advance_ms(120_000).await;
    timer.flush().await;

    assert_eq!(timer.state(), TimerState::Idle);
    let (_, row) = store.single_row().unwrap();
    assert!(row.completed);
}

#[tokio::test]
async fn build_rejects_out_of_range_initial_duration() {
    let store = Arc::new(MemoryStore::new());
    let result = FocusTimer::builder(store, Arc::new(StaticIdentity::new("user-1")))
        .duration_min(181)
        .build();
    assert!(matches!(
        result,
        Err(CoreError::Validation(ValidationError::DurationOutOfRange { minutes: 181, .. }))
    ));
}
