//! Single-writer async driver.
//!
//! One actor task owns the [`CycleTimer`]. Control calls and ticks share a
//! single queue, so they are applied strictly one after another. The
//! one-second ticker is a separate task whose handle lives next to the
//! timer; it is aborted before any `pause`/`stop` reply is sent.

use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

use super::engine::CycleTimer;
use super::view::TimerView;
use crate::error::{CoreError, Result};
use crate::events::Event;

const TICK_PERIOD: Duration = Duration::from_secs(1);
const COMMAND_QUEUE: usize = 32;
const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy)]
enum Control {
    Start,
    Pause,
    Resume,
    Stop,
    View,
}

enum Command {
    Control(Control, oneshot::Sender<Result<TimerView>>),
    Tick,
    Shutdown,
}

/// Handle to a running timer actor. Cheap to clone.
#[derive(Clone)]
pub struct TimerDriver {
    tx: mpsc::Sender<Command>,
    events: broadcast::Sender<Event>,
}

impl TimerDriver {
    /// Spawn the actor on the current tokio runtime. If the restored timer
    /// is already running, ticking resumes immediately.
    pub fn spawn(timer: CycleTimer) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE);
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let actor = Actor {
            timer,
            rx,
            tick_tx: tx.downgrade(),
            events: events.clone(),
            ticker: None,
        };
        let handle = tokio::spawn(actor.run());
        (Self { tx, events }, handle)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub async fn start(&self) -> Result<TimerView> {
        self.control(Control::Start).await
    }

    pub async fn pause(&self) -> Result<TimerView> {
        self.control(Control::Pause).await
    }

    pub async fn resume(&self) -> Result<TimerView> {
        self.control(Control::Resume).await
    }

    pub async fn stop(&self) -> Result<TimerView> {
        self.control(Control::Stop).await
    }

    pub async fn view(&self) -> Result<TimerView> {
        self.control(Control::View).await
    }

    /// Stop the actor. Persisted state is left as is.
    pub async fn shutdown(&self) -> Result<()> {
        self.tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| CoreError::DriverClosed)
    }

    async fn control(&self, op: Control) -> Result<TimerView> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Control(op, reply_tx))
            .await
            .map_err(|_| CoreError::DriverClosed)?;
        reply_rx.await.map_err(|_| CoreError::DriverClosed)?
    }
}

struct Actor {
    timer: CycleTimer,
    rx: mpsc::Receiver<Command>,
    tick_tx: mpsc::WeakSender<Command>,
    events: broadcast::Sender<Event>,
    ticker: Option<JoinHandle<()>>,
}

impl Actor {
    async fn run(mut self) {
        debug!("timer driver started");
        self.sync_ticker();

        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                Command::Control(op, reply) => {
                    let result = self.apply(op);
                    let _ = reply.send(result);
                }
                Command::Tick => {
                    match self.timer.tick() {
                        Ok(Some(event)) => self.publish(event),
                        Ok(None) => {}
                        Err(e) => error!("tick failed: {e}"),
                    }
                    self.sync_ticker();
                }
                Command::Shutdown => break,
            }
        }

        self.stop_ticker();
        debug!("timer driver stopped");
    }

    fn apply(&mut self, op: Control) -> Result<TimerView> {
        let outcome = match op {
            Control::Start => self.timer.start(),
            Control::Pause => self.timer.pause(),
            Control::Resume => self.timer.resume(),
            Control::Stop => self.timer.stop(),
            Control::View => Ok(None),
        };
        // Whatever happened, the ticker must match the timer before we reply.
        self.sync_ticker();
        match outcome {
            Ok(Some(event)) => self.publish(event),
            Ok(None) => {}
            Err(e) => {
                error!(?op, "timer command failed: {e}");
                return Err(e);
            }
        }
        self.timer.view()
    }

    fn publish(&self, event: Event) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn sync_ticker(&mut self) {
        if self.timer.is_ticking() {
            if self.ticker.is_none() {
                self.ticker = Some(spawn_ticker(self.tick_tx.clone()));
            }
        } else {
            self.stop_ticker();
        }
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

fn spawn_ticker(tx: mpsc::WeakSender<Command>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK_PERIOD);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            let Some(tx) = tx.upgrade() else { break };
            if tx.send(Command::Tick).await.is_err() {
                break;
            }
        }
    })
}
