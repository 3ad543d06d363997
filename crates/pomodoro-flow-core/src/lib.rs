//! # Pomodoro Flow Core Library
//!
//! Business logic for the Pomodoro Flow timer: a countdown that cycles
//! between work intervals and short/long breaks, persists its progress in a
//! key-value store and schedules a local alert for the end of each
//! interval.
//!
//! ## Architecture
//!
//! - **Cycle state machine**: pomodoro -> break -> pomodoro, with a long
//!   break after every fourth completed pomodoro
//! - **Countdown engine**: [`CycleTimer`], a synchronous state machine the
//!   caller ticks once per second
//! - **Driver**: [`TimerDriver`], a tokio actor that serializes control
//!   calls and ticks and broadcasts [`Event`]s
//! - **Storage**: [`KeyValueStore`] adapters (SQLite, in-memory), the typed
//!   [`StateStore`] and TOML [`Settings`]
//! - **Notifications**: [`NotificationScheduler`] over a platform
//!   [`Notifier`]
//!
//! Nothing here is a global: the store, scheduler, settings and clock are
//! built by the caller and handed to [`CycleTimer::restore`].

pub mod clock;
pub mod error;
pub mod events;
pub mod notify;
pub mod storage;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, NotifyError, StorageError};
pub use events::Event;
pub use notify::{Alert, MemoryNotifier, NotificationScheduler, Notifier};
pub use storage::{KeyValueStore, MemoryStore, Settings, SqliteStore, StateStore};
pub use timer::{CycleState, CycleTimer, RunState, TimerDriver, TimerView, Tone};
