use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CycleState;

/// Colour category of the countdown label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Active,
    Break,
}

impl From<CycleState> for Tone {
    fn from(state: CycleState) -> Self {
        if state.is_break() {
            Tone::Break
        } else {
            Tone::Active
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonVisibility {
    pub start_hidden: bool,
    pub pause_hidden: bool,
    pub resume_hidden: bool,
    pub stop_hidden: bool,
}

impl ButtonVisibility {
    pub fn new(is_running: bool, is_paused: bool) -> Self {
        Self {
            start_hidden: is_running,
            stop_hidden: !is_running,
            pause_hidden: is_paused || !is_running,
            resume_hidden: !is_paused || !is_running,
        }
    }
}

/// Everything the presentation layer needs to render the timer screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerView {
    pub state: CycleState,
    pub remaining_secs: u64,
    pub countdown: String,
    pub tone: Tone,
    pub is_running: bool,
    pub is_paused: bool,
    pub buttons: ButtonVisibility,
    pub pomodoros_today: u32,
    pub target_pomodoros: u32,
    pub fire_at: Option<DateTime<Utc>>,
}

/// `MM:SS`, with minutes allowed to grow past two digits.
pub fn format_countdown(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
