//! Local notification scheduling.
//!
//! The platform facility is abstracted behind [`Notifier`]. The
//! [`NotificationScheduler`] turns "this interval ends in N seconds" into a
//! single outstanding [`Alert`] and records its fire date in the state
//! store. A failing facility never interrupts the countdown.

mod memory;

pub use memory::MemoryNotifier;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{NotifyError, StorageError};
use crate::storage::{NotificationSettings, StateStore, TimerSettings};
use crate::timer::CycleState;

/// A scheduled user-facing alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub fire_at: DateTime<Utc>,
    pub title: String,
    pub body: String,
    pub badge: u32,
    /// `None` means the platform default sound.
    pub sound: Option<String>,
}

/// Platform notification facility. Fire-and-forget.
pub trait Notifier: Send {
    fn schedule(&mut self, alert: &Alert) -> Result<(), NotifyError>;
    fn cancel_all(&mut self) -> Result<(), NotifyError>;
}

pub struct NotificationScheduler {
    notifier: Box<dyn Notifier>,
    prefs: NotificationSettings,
}

impl NotificationScheduler {
    pub fn new(notifier: Box<dyn Notifier>, prefs: NotificationSettings) -> Self {
        Self { notifier, prefs }
    }

    /// Schedule the end-of-interval alert for `state`, replacing any
    /// outstanding one. `interval` overrides the configured length (used
    /// when resuming).
    ///
    /// Returns the recorded fire date, or `None` if the facility declined.
    pub fn schedule(
        &mut self,
        store: &mut StateStore,
        timer: &TimerSettings,
        state: CycleState,
        interval: Option<u64>,
    ) -> Result<Option<DateTime<Utc>>, StorageError> {
        self.cancel_pending();
        store.set_fire_date(None)?;

        if !self.prefs.enabled {
            info!(%state, "notifications disabled, not scheduling");
            return Ok(None);
        }

        let secs = interval.unwrap_or_else(|| state.duration_secs(timer));
        let Some(fire_at) = store.deadline_in(secs) else {
            warn!(%state, secs, "fire date out of range, not scheduling");
            return Ok(None);
        };
        let (title, body) = state.alert_text();
        let alert = Alert {
            fire_at,
            title: title.to_string(),
            body: body.to_string(),
            badge: 1,
            sound: self.prefs.sound.clone(),
        };

        match self.notifier.schedule(&alert) {
            Ok(()) => {
                store.set_fire_date(Some(fire_at))?;
                info!(%state, %fire_at, "notification scheduled");
                Ok(Some(fire_at))
            }
            Err(e) => {
                warn!(%state, "notification not scheduled: {e}");
                Ok(None)
            }
        }
    }

    /// Cancel every pending alert and forget the fire date.
    pub fn suspend(&mut self, store: &mut StateStore) -> Result<(), StorageError> {
        self.cancel_pending();
        store.set_fire_date(None)?;
        info!("notification canceled");
        Ok(())
    }

    fn cancel_pending(&mut self) {
        if let Err(e) = self.notifier.cancel_all() {
            warn!("failed to cancel notifications: {e}");
        }
    }
}
