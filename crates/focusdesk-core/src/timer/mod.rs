pub mod accounting;
mod clock;
mod driver;
mod engine;

pub use clock::{Clock, ManualClock, SystemClock};
pub use driver::{FocusTimer, FocusTimerBuilder};
pub use engine::{
    validate_duration, TickDirective, TimerEngine, TimerState, Transition, DEFAULT_DURATION_MIN,
    MAX_DURATION_MIN, MIN_DURATION_MIN,
};
