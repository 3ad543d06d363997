use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::CycleState;

/// Every change to the countdown produces an Event.
/// The driver broadcasts them; the UI re-renders from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        state: CycleState,
        remaining_secs: u64,
        /// `None` when the alert could not be scheduled.
        fire_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    },
    TimerPaused {
        state: CycleState,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        state: CycleState,
        remaining_secs: u64,
        fire_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    },
    TimerStopped {
        state: CycleState,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    Tick {
        state: CycleState,
        remaining_secs: u64,
    },
    /// An interval ran out and the next one is loaded, not started.
    IntervalCompleted {
        from: CycleState,
        to: CycleState,
        pomodoros_today: u32,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
}
