//! Desktop alerts via notify-rust.
//!
//! Each scheduled alert is a tokio task sleeping until its fire date, so
//! alerts only fire while this process is alive (`pomodoro-flow run`).
//! Badge numbers have no desktop equivalent and are ignored.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use notify_rust::Notification;
use pomodoro_flow_core::{Alert, Notifier, NotifyError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Clone, Default)]
pub struct DesktopNotifier {
    pending: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl DesktopNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait up to `timeout` for alerts that are due to fire.
    pub async fn drain(&self, timeout: Duration) {
        let handles: Vec<_> = match self.pending.lock() {
            Ok(mut pending) => pending.drain(..).collect(),
            Err(_) => return,
        };
        for handle in handles {
            if tokio::time::timeout(timeout, handle).await.is_err() {
                debug!("alert still pending at exit");
            }
        }
    }
}

impl Notifier for DesktopNotifier {
    fn schedule(&mut self, alert: &Alert) -> Result<(), NotifyError> {
        let runtime = Handle::try_current().map_err(|e| NotifyError::Unavailable(e.to_string()))?;
        let delay = (alert.fire_at - Utc::now()).to_std().unwrap_or_default();
        let alert = alert.clone();

        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let shown = tokio::task::spawn_blocking(move || show(&alert)).await;
            match shown {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("desktop notification failed: {e}"),
                Err(e) => warn!("desktop notification task failed: {e}"),
            }
        });

        let mut pending = self
            .pending
            .lock()
            .map_err(|_| NotifyError::Unavailable("notifier state poisoned".into()))?;
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
        Ok(())
    }

    fn cancel_all(&mut self) -> Result<(), NotifyError> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| NotifyError::Unavailable("notifier state poisoned".into()))?;
        for handle in pending.drain(..) {
            handle.abort();
        }
        Ok(())
    }
}

fn show(alert: &Alert) -> Result<(), String> {
    let mut notification = Notification::new();
    notification.summary(&alert.title).body(&alert.body);
    if let Some(sound) = &alert.sound {
        notification.sound_name(sound);
    }
    notification.show().map(|_| ()).map_err(|e| e.to_string())
}
