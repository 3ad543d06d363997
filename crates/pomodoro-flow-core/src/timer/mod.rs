mod cycle;
mod driver;
mod engine;
mod view;

pub use cycle::{CycleState, POMODOROS_PER_LONG_BREAK};
pub use driver::TimerDriver;
pub use engine::{CycleTimer, RunState};
pub use view::{format_countdown, ButtonVisibility, TimerView, Tone};
