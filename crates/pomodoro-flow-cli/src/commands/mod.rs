pub mod completions;
pub mod config;
pub mod run;
pub mod stats;
pub mod timer;

use std::sync::Arc;

use pomodoro_flow_core::{
    CycleTimer, NotificationScheduler, Settings, SqliteStore, StateStore, SystemClock,
};

use crate::desktop::DesktopNotifier;

/// Build the timer from the on-disk settings and store.
pub(crate) fn open_timer(
    notifier: DesktopNotifier,
) -> Result<CycleTimer, Box<dyn std::error::Error>> {
    let settings = Settings::load()?;
    let store = StateStore::new(Box::new(SqliteStore::open()?), Arc::new(SystemClock));
    let scheduler = NotificationScheduler::new(Box::new(notifier), settings.notifications);
    Ok(CycleTimer::restore(store, scheduler, settings.timer)?)
}
