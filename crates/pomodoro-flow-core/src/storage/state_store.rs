//! Typed view over the persisted timer fields.
//!
//! Keys:
//! - `<yyyy-MM-dd>`: pomodoros completed on that local day
//! - `PausedTime`: seconds remaining when paused, absent otherwise
//! - `FireDate`: RFC 3339 time of the outstanding alert, absent otherwise
//! - `EndsAt`: RFC 3339 time the running interval ends, absent unless running
//! - `State`: `pomodoro` | `shortBreak` | `longBreak`

use chrono::{DateTime, Days, Local, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::KeyValueStore;
use crate::clock::Clock;
use crate::error::StorageError;
use crate::timer::CycleState;

pub const PAUSED_TIME_KEY: &str = "PausedTime";
pub const FIRE_DATE_KEY: &str = "FireDate";
pub const STATE_KEY: &str = "State";
pub const ENDS_AT_KEY: &str = "EndsAt";

/// Longest history `history` will walk back, about ten years.
pub const MAX_HISTORY_DAYS: u32 = 3650;

/// Completed pomodoros on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCount {
    pub date: String,
    pub count: u32,
}

pub struct StateStore {
    kv: Box<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl StateStore {
    pub fn new(kv: Box<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { kv, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// `secs` from now, or `None` if that is not a representable time.
    pub fn deadline_in(&self, secs: u64) -> Option<DateTime<Utc>> {
        let delta = TimeDelta::try_seconds(i64::try_from(secs).ok()?)?;
        self.now().checked_add_signed(delta)
    }

    // ── Pomodoro counter ─────────────────────────────────────────────

    pub fn pomodoros_today(&self) -> Result<u32, StorageError> {
        self.pomodoros_on(&self.clock.today_key())
    }

    /// Add one to today's count and return the new value.
    pub fn increment_pomodoros(&mut self) -> Result<u32, StorageError> {
        let key = self.clock.today_key();
        let count = self.pomodoros_on(&key)?.saturating_add(1);
        self.kv.set_int(&key, i64::from(count))?;
        debug!(date = %key, count, "pomodoro count updated");
        Ok(count)
    }

    /// Counts for the last `days` local days, most recent first. Capped at
    /// [`MAX_HISTORY_DAYS`].
    pub fn history(&self, days: u32) -> Result<Vec<DayCount>, StorageError> {
        let days = days.min(MAX_HISTORY_DAYS);
        let today = self.clock.now().with_timezone(&Local).date_naive();
        let mut out = Vec::with_capacity(days as usize);
        for offset in 0..days {
            let Some(day) = today.checked_sub_days(Days::new(u64::from(offset))) else {
                break;
            };
            let date = day.format("%Y-%m-%d").to_string();
            let count = self.pomodoros_on(&date)?;
            out.push(DayCount { date, count });
        }
        Ok(out)
    }

    fn pomodoros_on(&self, key: &str) -> Result<u32, StorageError> {
        Ok(self
            .kv
            .get_int(key)?
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0))
    }

    // ── Pause ────────────────────────────────────────────────────────

    pub fn paused_time(&self) -> Result<Option<u64>, StorageError> {
        Ok(self
            .kv
            .get_int(PAUSED_TIME_KEY)?
            .and_then(|n| u64::try_from(n).ok())
            .filter(|&n| n > 0))
    }

    /// Zero is treated the same as `None` and clears the key.
    pub fn set_paused_time(&mut self, secs: Option<u64>) -> Result<(), StorageError> {
        match secs.filter(|&n| n > 0) {
            Some(secs) => self
                .kv
                .set_int(PAUSED_TIME_KEY, i64::try_from(secs).unwrap_or(i64::MAX)),
            None => self.kv.remove_key(PAUSED_TIME_KEY),
        }
    }

    pub fn is_paused(&self) -> Result<bool, StorageError> {
        Ok(self.paused_time()?.is_some())
    }

    // ── Fire date ────────────────────────────────────────────────────

    pub fn fire_date(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        self.instant(FIRE_DATE_KEY)
    }

    pub fn set_fire_date(&mut self, at: Option<DateTime<Utc>>) -> Result<(), StorageError> {
        self.set_instant(FIRE_DATE_KEY, at)
    }

    // ── Running deadline ─────────────────────────────────────────────

    /// When the running interval ends. Recorded whether or not an alert
    /// could be scheduled.
    pub fn ends_at(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        self.instant(ENDS_AT_KEY)
    }

    pub fn set_ends_at(&mut self, at: Option<DateTime<Utc>>) -> Result<(), StorageError> {
        self.set_instant(ENDS_AT_KEY, at)
    }

    fn instant(&self, key: &str) -> Result<Option<DateTime<Utc>>, StorageError> {
        Ok(self
            .kv
            .get_object(key)?
            .and_then(|v| serde_json::from_value(v).ok()))
    }

    fn set_instant(&mut self, key: &str, at: Option<DateTime<Utc>>) -> Result<(), StorageError> {
        match at {
            Some(at) => {
                let value = serde_json::to_value(at).map_err(|e| StorageError::Encoding {
                    key: key.to_string(),
                    message: e.to_string(),
                })?;
                self.kv.set_object(key, &value)
            }
            None => self.kv.remove_key(key),
        }
    }

    // ── Cycle state ──────────────────────────────────────────────────

    pub fn current_state(&self) -> Result<CycleState, StorageError> {
        Ok(self
            .kv
            .get_raw(STATE_KEY)?
            .map(|s| CycleState::from_persisted(&s))
            .unwrap_or_default())
    }

    pub fn set_current_state(&mut self, state: CycleState) -> Result<(), StorageError> {
        self.kv.set_raw(STATE_KEY, state.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;
    use chrono::{Duration, TimeZone};

    fn store_at(at: DateTime<Utc>) -> (StateStore, MemoryStore, ManualClock) {
        let mem = MemoryStore::new();
        let clock = ManualClock::new(at);
        let store = StateStore::new(Box::new(mem.clone()), Arc::new(clock.clone()));
        (store, mem, clock)
    }

    fn noon() -> DateTime<Utc> {
        Local
            .with_ymd_and_hms(2024, 3, 13, 12, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn defaults_when_empty() {
        let (store, _, _) = store_at(noon());
        assert_eq!(store.current_state().unwrap(), CycleState::Pomodoro);
        assert_eq!(store.pomodoros_today().unwrap(), 0);
        assert_eq!(store.paused_time().unwrap(), None);
        assert_eq!(store.fire_date().unwrap(), None);
    }

    #[test]
    fn counter_is_keyed_by_local_date() {
        let (mut store, mem, clock) = store_at(noon());
        assert_eq!(store.increment_pomodoros().unwrap(), 1);
        assert_eq!(store.increment_pomodoros().unwrap(), 2);
        assert!(mem.contains("2024-03-13"));

        clock.advance_secs(24 * 60 * 60);
        assert_eq!(store.pomodoros_today().unwrap(), 0);
    }

    #[test]
    fn paused_time_zero_clears_key() {
        let (mut store, mem, _) = store_at(noon());
        store.set_paused_time(Some(900)).unwrap();
        assert_eq!(store.paused_time().unwrap(), Some(900));
        assert!(store.is_paused().unwrap());

        store.set_paused_time(Some(0)).unwrap();
        assert!(!mem.contains(PAUSED_TIME_KEY));
        assert!(!store.is_paused().unwrap());
    }

    #[test]
    fn fire_date_set_and_clear() {
        let (mut store, mem, _) = store_at(noon());
        let at = noon() + Duration::seconds(1500);
        store.set_fire_date(Some(at)).unwrap();
        assert_eq!(store.fire_date().unwrap(), Some(at));
        store.set_fire_date(None).unwrap();
        assert!(!mem.contains(FIRE_DATE_KEY));
    }

    #[test]
    fn state_persists_as_string() {
        let (mut store, mut mem, _) = store_at(noon());
        store.set_current_state(CycleState::LongBreak).unwrap();
        assert_eq!(mem.get_raw(STATE_KEY).unwrap().as_deref(), Some("longBreak"));

        mem.set_raw(STATE_KEY, "bogus").unwrap();
        assert_eq!(store.current_state().unwrap(), CycleState::Pomodoro);
    }

    #[test]
    fn history_walks_back_from_today() {
        let (mut store, _, clock) = store_at(noon());
        store.increment_pomodoros().unwrap();
        clock.advance_secs(24 * 60 * 60);
        store.increment_pomodoros().unwrap();
        store.increment_pomodoros().unwrap();

        let history = store.history(3).unwrap();
        assert_eq!(
            history,
            vec![
                DayCount { date: "2024-03-14".into(), count: 2 },
                DayCount { date: "2024-03-13".into(), count: 1 },
                DayCount { date: "2024-03-12".into(), count: 0 },
            ]
        );
    }

    #[test]
    fn history_is_capped() {
        let (store, _, _) = store_at(noon());
        let history = store.history(u32::MAX).unwrap();
        assert_eq!(history.len(), MAX_HISTORY_DAYS as usize);
        assert_eq!(history[0].date, "2024-03-13");
    }

    #[test]
    fn ends_at_set_and_clear() {
        let (mut store, mem, _) = store_at(noon());
        let at = store.deadline_in(300);
        assert_eq!(at, Some(noon() + Duration::seconds(300)));
        store.set_ends_at(at).unwrap();
        assert_eq!(store.ends_at().unwrap(), at);
        assert_eq!(store.fire_date().unwrap(), None);
        store.set_ends_at(None).unwrap();
        assert!(!mem.contains(ENDS_AT_KEY));
    }

    #[test]
    fn deadline_out_of_range_is_none() {
        let (store, _, _) = store_at(noon());
        assert_eq!(store.deadline_in(u64::MAX), None);
        assert_eq!(store.deadline_in(100_000_000_000_000), None);
    }
}
