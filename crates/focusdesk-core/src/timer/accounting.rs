//! Active-time accounting for interrupted runs.
//!
//! ```text
//! elapsed  = now - session_start
//! open     = paused ? now - last_pause : 0
//! active   = elapsed - total_paused - open
//! minutes  = floor(active / 60_000)
//! ```
//!
//! All arithmetic saturates, so a clock reading older than the anchors
//! yields zero instead of wrapping.

pub const MS_PER_MINUTE: u64 = 60_000;

/// Milliseconds the run spent counting down, excluding every pause
/// (including one still open at `now_ms`).
pub fn active_ms(
    session_start_ms: u64,
    now_ms: u64,
    total_paused_ms: u64,
    open_pause_since_ms: Option<u64>,
) -> u64 {
    let elapsed = now_ms.saturating_sub(session_start_ms);
    let open = open_pause_since_ms
        .map(|since| now_ms.saturating_sub(since))
        .unwrap_or(0);
    elapsed.saturating_sub(total_paused_ms).saturating_sub(open)
}

/// Whole minutes credited to a run that ends without completing.
pub fn interrupted_minutes(
    session_start_ms: u64,
    now_ms: u64,
    total_paused_ms: u64,
    open_pause_since_ms: Option<u64>,
) -> u32 {
    let active = active_ms(session_start_ms, now_ms, total_paused_ms, open_pause_since_ms);
    u32::try_from(active / MS_PER_MINUTE).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn excludes_closed_and_open_pauses() {
        // 10 min elapsed, 3 min of closed pauses, paused again 2 min ago.
        let start = 1_000_000;
        let now = start + 10 * MS_PER_MINUTE;
        let minutes = interrupted_minutes(start, now, 3 * MS_PER_MINUTE, Some(now - 2 * MS_PER_MINUTE));
        assert_eq!(minutes, 5);
    }

    #[test]
    fn floors_partial_minutes() {
        let start = 0;
        assert_eq!(interrupted_minutes(start, 179_999, 0, None), 2);
        assert_eq!(interrupted_minutes(start, 180_000, 0, None), 3);
    }

    #[test]
    fn clock_behind_anchor_yields_zero() {
        assert_eq!(active_ms(5_000, 1_000, 0, None), 0);
        assert_eq!(active_ms(0, 1_000, 5_000, None), 0);
    }

    proptest! {
        /// Splitting the same active seconds across any number of pause
        /// cycles never changes the accounted active time.
        #[test]
        fn active_time_is_invariant_to_pause_cycles(
            segments in prop::collection::vec((1u64..600, 0u64..3_600), 1..12),
        ) {
            let start = 1_700_000_000_000u64;
            let mut now = start;
            let mut total_paused = 0u64;
            let mut active_secs = 0u64;
            for (run_secs, pause_secs) in &segments {
                now += run_secs * 1000;
                active_secs += run_secs;
                now += pause_secs * 1000;
                total_paused += pause_secs * 1000;
            }
            prop_assert_eq!(active_ms(start, now, total_paused, None), active_secs * 1000);
        }

        #[test]
        fn open_pause_is_never_counted(
            active_secs in 0u64..10_800,
            open_secs in 0u64..10_800,
        ) {
            let start = 0u64;
            let pause_at = start + active_secs * 1000;
            let now = pause_at + open_secs * 1000;
            prop_assert_eq!(active_ms(start, now, 0, Some(pause_at)), active_secs * 1000);
        }
    }
}
