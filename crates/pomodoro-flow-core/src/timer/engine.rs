//! Countdown engine.
//!
//! `CycleTimer` owns the in-memory countdown and writes every persisted
//! field through the [`StateStore`]. It has no thread of its own: the
//! caller (normally [`TimerDriver`](super::TimerDriver)) invokes `tick()`
//! once per second while [`CycleTimer::is_ticking`] is true.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Paused -> Running -> (tick to 0) -> Idle, next interval loaded
//!            \-------------------\----> stop() -> Idle, same interval reloaded
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut timer = CycleTimer::restore(store, scheduler, settings.timer)?;
//! timer.start()?;
//! // once per second:
//! timer.tick()?; // Some(Event::IntervalCompleted { .. }) at zero
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::view::{format_countdown, ButtonVisibility, Tone, TimerView};
use super::CycleState;
use crate::error::Result;
use crate::events::Event;
use crate::notify::NotificationScheduler;
use crate::storage::{StateStore, TimerSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Paused,
}

pub struct CycleTimer {
    store: StateStore,
    scheduler: NotificationScheduler,
    settings: TimerSettings,
    state: CycleState,
    run_state: RunState,
    remaining_secs: u64,
}

impl CycleTimer {
    /// Rebuild the countdown from persisted fields.
    ///
    /// - PausedTime present: paused at that many seconds.
    /// - EndsAt (or, failing that, FireDate) in the future: running, with
    ///   the time left until it.
    /// - Either in the past: the interval ended while we were away, so
    ///   the transition is applied once and the timer comes back idle.
    /// - Otherwise idle with the current state's full length.
    pub fn restore(
        store: StateStore,
        scheduler: NotificationScheduler,
        settings: TimerSettings,
    ) -> Result<Self> {
        let state = store.current_state()?;
        let mut timer = Self {
            remaining_secs: state.duration_secs(&settings),
            store,
            scheduler,
            settings,
            state,
            run_state: RunState::Idle,
        };

        if let Some(paused) = timer.store.paused_time()? {
            timer.remaining_secs = paused;
            timer.run_state = RunState::Paused;
        } else if let Some(ends_at) = timer.store.ends_at()?.or(timer.store.fire_date()?) {
            let left_ms = (ends_at - timer.store.now()).num_milliseconds();
            if left_ms > 0 {
                timer.remaining_secs = u64::try_from(left_ms).unwrap_or(0).div_ceil(1000);
                timer.run_state = RunState::Running;
            } else {
                info!(state = %timer.state, "interval finished while away");
                timer.complete_interval()?;
            }
        }

        debug!(
            state = %timer.state,
            run_state = ?timer.run_state,
            remaining_secs = timer.remaining_secs,
            "timer restored"
        );
        Ok(timer)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    /// True from `start()` until `stop()` or the end of the interval,
    /// including while paused.
    pub fn is_running(&self) -> bool {
        self.run_state != RunState::Idle
    }

    pub fn is_paused(&self) -> bool {
        self.run_state == RunState::Paused
    }

    /// Whether `tick()` should currently be called.
    pub fn is_ticking(&self) -> bool {
        self.run_state == RunState::Running
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn full_duration_secs(&self) -> u64 {
        self.state.duration_secs(&self.settings)
    }

    pub fn view(&self) -> Result<TimerView> {
        let is_running = self.is_running();
        let is_paused = self.is_paused();
        Ok(TimerView {
            state: self.state,
            remaining_secs: self.remaining_secs,
            countdown: format_countdown(self.remaining_secs),
            tone: Tone::from(self.state),
            is_running,
            is_paused,
            buttons: ButtonVisibility::new(is_running, is_paused),
            pomodoros_today: self.store.pomodoros_today()?,
            target_pomodoros: self.settings.target_pomodoros,
            fire_at: self.store.fire_date()?,
        })
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Result<Option<Event>> {
        match self.run_state {
            RunState::Running => Ok(None),
            RunState::Paused => self.resume(),
            RunState::Idle => {
                if self.remaining_secs == 0 {
                    self.remaining_secs = self.full_duration_secs();
                }
                let fire_at = self.scheduler.schedule(
                    &mut self.store,
                    &self.settings,
                    self.state,
                    Some(self.remaining_secs),
                )?;
                self.mark_running()?;
                info!(state = %self.state, remaining_secs = self.remaining_secs, "timer started");
                Ok(Some(Event::TimerStarted {
                    state: self.state,
                    remaining_secs: self.remaining_secs,
                    fire_at,
                    at: self.store.now(),
                }))
            }
        }
    }

    pub fn pause(&mut self) -> Result<Option<Event>> {
        if self.run_state != RunState::Running {
            return Ok(None);
        }
        self.store.set_paused_time(Some(self.remaining_secs))?;
        self.store.set_ends_at(None)?;
        self.scheduler.suspend(&mut self.store)?;
        self.run_state = RunState::Paused;
        info!(state = %self.state, remaining_secs = self.remaining_secs, "timer paused");
        Ok(Some(Event::TimerPaused {
            state: self.state,
            remaining_secs: self.remaining_secs,
            at: self.store.now(),
        }))
    }

    pub fn resume(&mut self) -> Result<Option<Event>> {
        if self.run_state != RunState::Paused {
            return Ok(None);
        }
        let secs = self.store.paused_time()?.unwrap_or(self.remaining_secs);
        self.remaining_secs = secs;
        let fire_at =
            self.scheduler
                .schedule(&mut self.store, &self.settings, self.state, Some(secs))?;
        self.store.set_paused_time(None)?;
        self.mark_running()?;
        info!(state = %self.state, remaining_secs = secs, "timer resumed");
        Ok(Some(Event::TimerResumed {
            state: self.state,
            remaining_secs: secs,
            fire_at,
            at: self.store.now(),
        }))
    }

    /// Cancel the alert and reload the current interval. Always emits.
    pub fn stop(&mut self) -> Result<Option<Event>> {
        self.scheduler.suspend(&mut self.store)?;
        self.store.set_paused_time(None)?;
        self.store.set_ends_at(None)?;
        self.remaining_secs = self.full_duration_secs();
        self.run_state = RunState::Idle;
        info!(state = %self.state, "timer stopped");
        Ok(Some(Event::TimerStopped {
            state: self.state,
            remaining_secs: self.remaining_secs,
            at: self.store.now(),
        }))
    }

    /// Call once per second. Returns `Event::IntervalCompleted` at zero.
    pub fn tick(&mut self) -> Result<Option<Event>> {
        if self.run_state != RunState::Running {
            return Ok(None);
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        debug!(remaining_secs = self.remaining_secs, "tick");
        if self.remaining_secs > 0 {
            return Ok(Some(Event::Tick {
                state: self.state,
                remaining_secs: self.remaining_secs,
            }));
        }
        self.complete_interval().map(Some)
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Record when the current countdown ends so a later process can pick
    /// it up even if no alert was scheduled.
    fn mark_running(&mut self) -> Result<()> {
        let ends_at = self.store.deadline_in(self.remaining_secs);
        self.store.set_ends_at(ends_at)?;
        self.run_state = RunState::Running;
        Ok(())
    }

    /// Move to the next interval, counting the pomodoro if one just ended.
    /// Leaves the timer idle with the new interval's full length.
    fn complete_interval(&mut self) -> Result<Event> {
        let from = self.state;
        let pomodoros_today = if from == CycleState::Pomodoro {
            self.store.increment_pomodoros()?
        } else {
            self.store.pomodoros_today()?
        };
        let to = from.next(pomodoros_today);

        self.store.set_current_state(to)?;
        self.store.set_paused_time(None)?;
        self.store.set_fire_date(None)?;
        self.store.set_ends_at(None)?;
        self.state = to;
        self.remaining_secs = self.full_duration_secs();
        self.run_state = RunState::Idle;

        info!(%from, %to, pomodoros_today, "interval completed");
        Ok(Event::IntervalCompleted {
            from,
            to,
            pomodoros_today,
            remaining_secs: self.remaining_secs,
            at: self.store.now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::notify::MemoryNotifier;
    use crate::storage::{MemoryStore, NotificationSettings, ENDS_AT_KEY, PAUSED_TIME_KEY};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::Arc;

    struct Fixture {
        timer: CycleTimer,
        mem: MemoryStore,
        notifier: MemoryNotifier,
        clock: ManualClock,
    }

    fn start_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 13, 12, 0, 0).unwrap()
    }

    fn settings() -> TimerSettings {
        TimerSettings {
            pomodoro_length: 5,
            short_break_length: 2,
            long_break_length: 3,
            target_pomodoros: 4,
        }
    }

    fn restore_with(mem: MemoryStore, notifier: MemoryNotifier, clock: ManualClock) -> Fixture {
        restore_with_prefs(mem, notifier, clock, NotificationSettings::default())
    }

    fn restore_with_prefs(
        mem: MemoryStore,
        notifier: MemoryNotifier,
        clock: ManualClock,
        prefs: NotificationSettings,
    ) -> Fixture {
        let store = StateStore::new(Box::new(mem.clone()), Arc::new(clock.clone()));
        let scheduler = NotificationScheduler::new(Box::new(notifier.clone()), prefs);
        let timer = CycleTimer::restore(store, scheduler, settings()).unwrap();
        Fixture {
            timer,
            mem,
            notifier,
            clock,
        }
    }

    fn fixture() -> Fixture {
        restore_with(
            MemoryStore::new(),
            MemoryNotifier::new(),
            ManualClock::new(start_time()),
        )
    }

    #[test]
    fn fresh_timer_is_idle_pomodoro() {
        let f = fixture();
        assert_eq!(f.timer.state(), CycleState::Pomodoro);
        assert_eq!(f.timer.run_state(), RunState::Idle);
        assert_eq!(f.timer.remaining_secs(), 5);
        assert!(!f.timer.is_running());
    }

    #[test]
    fn start_schedules_alert_and_runs() {
        let mut f = fixture();
        let event = f.timer.start().unwrap().unwrap();
        assert!(matches!(event, Event::TimerStarted { remaining_secs: 5, .. }));
        assert!(f.timer.is_ticking());
        assert_eq!(f.notifier.pending().len(), 1);
        assert_eq!(
            f.timer.store().fire_date().unwrap(),
            Some(start_time() + Duration::seconds(5))
        );
    }

    #[test]
    fn start_twice_is_a_no_op() {
        let mut f = fixture();
        f.timer.start().unwrap();
        assert!(f.timer.start().unwrap().is_none());
        assert_eq!(f.notifier.delivered().len(), 1);
    }

    #[test]
    fn double_pause_and_resume_are_no_ops() {
        let mut f = fixture();
        assert!(f.timer.pause().unwrap().is_none());
        assert!(f.timer.resume().unwrap().is_none());

        f.timer.start().unwrap();
        assert!(f.timer.pause().unwrap().is_some());
        assert!(f.timer.pause().unwrap().is_none());
        assert!(f.timer.resume().unwrap().is_some());
        assert!(f.timer.resume().unwrap().is_none());
    }

    #[test]
    fn start_while_paused_resumes() {
        let mut f = fixture();
        f.timer.start().unwrap();
        f.timer.tick().unwrap();
        f.timer.pause().unwrap();
        let event = f.timer.start().unwrap().unwrap();
        assert!(matches!(event, Event::TimerResumed { remaining_secs: 4, .. }));
    }

    #[test]
    fn tick_is_ignored_unless_running() {
        let mut f = fixture();
        assert!(f.timer.tick().unwrap().is_none());
        f.timer.start().unwrap();
        f.timer.pause().unwrap();
        assert!(f.timer.tick().unwrap().is_none());
        assert_eq!(f.timer.remaining_secs(), 5);
    }

    #[test]
    fn stop_reloads_full_duration() {
        let mut f = fixture();
        f.timer.start().unwrap();
        f.timer.tick().unwrap();
        f.timer.tick().unwrap();
        f.timer.pause().unwrap();
        f.timer.stop().unwrap();

        assert_eq!(f.timer.remaining_secs(), 5);
        assert!(!f.timer.is_running());
        assert!(!f.mem.contains(PAUSED_TIME_KEY));
        assert!(f.notifier.pending().is_empty());
        assert_eq!(f.timer.store().fire_date().unwrap(), None);
    }

    #[test]
    fn completion_loads_next_interval_without_starting() {
        let mut f = fixture();
        f.timer.start().unwrap();
        for _ in 0..4 {
            assert!(matches!(f.timer.tick().unwrap(), Some(Event::Tick { .. })));
        }
        let event = f.timer.tick().unwrap().unwrap();
        assert!(matches!(
            event,
            Event::IntervalCompleted {
                from: CycleState::Pomodoro,
                to: CycleState::ShortBreak,
                pomodoros_today: 1,
                remaining_secs: 2,
                ..
            }
        ));
        assert_eq!(f.timer.state(), CycleState::ShortBreak);
        assert_eq!(f.timer.remaining_secs(), 2);
        assert!(!f.timer.is_ticking());
        assert_eq!(f.timer.store().fire_date().unwrap(), None);
    }

    #[test]
    fn break_completion_does_not_count() {
        let mut f = fixture();
        f.timer.start().unwrap();
        for _ in 0..5 {
            f.timer.tick().unwrap();
        }
        f.timer.start().unwrap();
        f.timer.tick().unwrap();
        f.timer.tick().unwrap();
        assert_eq!(f.timer.state(), CycleState::Pomodoro);
        assert_eq!(f.timer.store().pomodoros_today().unwrap(), 1);
    }

    #[test]
    fn view_reflects_run_state() {
        let mut f = fixture();
        let idle = f.timer.view().unwrap();
        assert_eq!(idle.countdown, "00:05");
        assert_eq!(idle.tone, Tone::Active);
        assert!(!idle.buttons.start_hidden);

        f.timer.start().unwrap();
        f.timer.pause().unwrap();
        let paused = f.timer.view().unwrap();
        assert!(paused.is_running && paused.is_paused);
        assert!(!paused.buttons.resume_hidden);
        assert_eq!(paused.target_pomodoros, 4);
    }

    #[test]
    fn restore_paused() {
        let mut f = fixture();
        f.timer.start().unwrap();
        f.timer.tick().unwrap();
        f.timer.pause().unwrap();

        let restored = restore_with(f.mem, f.notifier, f.clock);
        assert_eq!(restored.timer.run_state(), RunState::Paused);
        assert_eq!(restored.timer.remaining_secs(), 4);
    }

    #[test]
    fn restore_running_counts_from_fire_date() {
        let mut f = fixture();
        f.timer.start().unwrap();
        f.clock.advance_secs(2);

        let restored = restore_with(f.mem, f.notifier, f.clock);
        assert_eq!(restored.timer.run_state(), RunState::Running);
        assert_eq!(restored.timer.remaining_secs(), 3);
    }

    #[test]
    fn restore_after_fire_date_completes_interval() {
        let mut f = fixture();
        f.timer.start().unwrap();
        f.clock.advance_secs(60);

        let restored = restore_with(f.mem, f.notifier, f.clock);
        assert_eq!(restored.timer.run_state(), RunState::Idle);
        assert_eq!(restored.timer.state(), CycleState::ShortBreak);
        assert_eq!(restored.timer.remaining_secs(), 2);
        assert_eq!(restored.timer.store().pomodoros_today().unwrap(), 1);
        assert_eq!(restored.timer.store().fire_date().unwrap(), None);
    }

    #[test]
    fn denied_notifications_do_not_block_countdown() {
        let notifier = MemoryNotifier::new();
        notifier.deny();
        let mut f = restore_with(MemoryStore::new(), notifier, ManualClock::new(start_time()));
        let event = f.timer.start().unwrap().unwrap();
        assert!(matches!(event, Event::TimerStarted { fire_at: None, .. }));
        for _ in 0..5 {
            f.timer.tick().unwrap();
        }
        assert_eq!(f.timer.state(), CycleState::ShortBreak);
    }

    fn notifications_off() -> NotificationSettings {
        NotificationSettings {
            enabled: false,
            sound: None,
        }
    }

    #[test]
    fn restore_running_without_notifications() {
        let mem = MemoryStore::new();
        let clock = ManualClock::new(start_time());
        let mut f = restore_with_prefs(
            mem.clone(),
            MemoryNotifier::new(),
            clock.clone(),
            notifications_off(),
        );
        let event = f.timer.start().unwrap().unwrap();
        assert!(matches!(event, Event::TimerStarted { fire_at: None, .. }));
        assert_eq!(f.timer.store().fire_date().unwrap(), None);
        clock.advance_secs(2);

        let mut restored = restore_with_prefs(mem, f.notifier, clock, notifications_off());
        assert_eq!(restored.timer.run_state(), RunState::Running);
        assert_eq!(restored.timer.remaining_secs(), 3);
        let paused = restored.timer.pause().unwrap();
        assert!(matches!(paused, Some(Event::TimerPaused { remaining_secs: 3, .. })));
        assert!(!restored.mem.contains(ENDS_AT_KEY));
    }

    #[test]
    fn restore_without_notifications_completes_when_overdue() {
        let mem = MemoryStore::new();
        let clock = ManualClock::new(start_time());
        let mut f = restore_with_prefs(
            mem.clone(),
            MemoryNotifier::new(),
            clock.clone(),
            notifications_off(),
        );
        f.timer.start().unwrap();
        clock.advance_secs(60);

        let restored = restore_with_prefs(mem, f.notifier, clock, notifications_off());
        assert_eq!(restored.timer.run_state(), RunState::Idle);
        assert_eq!(restored.timer.state(), CycleState::ShortBreak);
        assert_eq!(restored.timer.store().pomodoros_today().unwrap(), 1);
        assert!(!restored.mem.contains(ENDS_AT_KEY));
    }

    #[test]
    fn stop_and_completion_clear_ends_at() {
        let mut f = fixture();
        f.timer.start().unwrap();
        assert!(f.mem.contains(ENDS_AT_KEY));
        f.timer.stop().unwrap();
        assert!(!f.mem.contains(ENDS_AT_KEY));

        f.timer.start().unwrap();
        for _ in 0..5 {
            f.timer.tick().unwrap();
        }
        assert!(!f.mem.contains(ENDS_AT_KEY));
    }

    #[test]
    fn event_timestamps_follow_the_clock() {
        let mut f = fixture();
        let started = f.timer.start().unwrap().unwrap();
        let Event::TimerStarted { at, fire_at, .. } = started else {
            panic!("expected TimerStarted");
        };
        assert_eq!(at, start_time());
        assert_eq!(fire_at, Some(start_time() + Duration::seconds(5)));

        f.clock.advance_secs(2);
        let paused = f.timer.pause().unwrap().unwrap();
        let two_secs_in = start_time() + Duration::seconds(2);
        assert!(matches!(paused, Event::TimerPaused { at, .. } if at == two_secs_in));
    }
}
