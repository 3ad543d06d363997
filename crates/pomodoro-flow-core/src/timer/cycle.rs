use serde::{Deserialize, Serialize};
use std::fmt;

use crate::storage::TimerSettings;

/// Every this many completed pomodoros the break is a long one.
pub const POMODOROS_PER_LONG_BREAK: u32 = 4;

/// Which interval the countdown is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CycleState {
    #[default]
    Pomodoro,
    ShortBreak,
    LongBreak,
}

impl CycleState {
    /// Persisted string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleState::Pomodoro => "pomodoro",
            CycleState::ShortBreak => "shortBreak",
            CycleState::LongBreak => "longBreak",
        }
    }

    /// Parse the persisted form. Anything unrecognised is a pomodoro.
    pub fn from_persisted(value: &str) -> Self {
        match value {
            "shortBreak" => CycleState::ShortBreak,
            "longBreak" => CycleState::LongBreak,
            _ => CycleState::Pomodoro,
        }
    }

    pub fn is_break(&self) -> bool {
        matches!(self, CycleState::ShortBreak | CycleState::LongBreak)
    }

    /// State that follows this one, given the number of pomodoros completed
    /// today (already including the one that just finished).
    pub fn next(&self, completed_pomodoros: u32) -> CycleState {
        if self.is_break() {
            return CycleState::Pomodoro;
        }
        if completed_pomodoros > 0 && completed_pomodoros % POMODOROS_PER_LONG_BREAK == 0 {
            CycleState::LongBreak
        } else {
            CycleState::ShortBreak
        }
    }

    /// Configured length of this interval in seconds.
    pub fn duration_secs(&self, settings: &TimerSettings) -> u64 {
        match self {
            CycleState::Pomodoro => settings.pomodoro_length,
            CycleState::ShortBreak => settings.short_break_length,
            CycleState::LongBreak => settings.long_break_length,
        }
    }

    /// Alert title and body delivered when this interval ends.
    pub fn alert_text(&self) -> (&'static str, &'static str) {
        match self {
            CycleState::Pomodoro => ("Pomodoro finished", "Time to take a break!"),
            CycleState::ShortBreak => ("Break finished", "Time to get back to work!"),
            CycleState::LongBreak => ("Long break is over", "Time to get back to work!"),
        }
    }
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
