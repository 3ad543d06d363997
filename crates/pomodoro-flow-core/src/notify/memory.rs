use std::sync::{Arc, Mutex};

use super::{Alert, Notifier};
use crate::error::NotifyError;

#[derive(Debug, Default)]
struct Inner {
    pending: Vec<Alert>,
    delivered: Vec<Alert>,
    denied: bool,
}

/// Records alerts instead of showing them. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryNotifier {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Behave as if the user denied notification permission.
    pub fn deny(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.denied = true;
        }
    }

    pub fn pending(&self) -> Vec<Alert> {
        self.inner
            .lock()
            .map(|inner| inner.pending.clone())
            .unwrap_or_default()
    }

    /// Every alert ever accepted, in order.
    pub fn delivered(&self) -> Vec<Alert> {
        self.inner
            .lock()
            .map(|inner| inner.delivered.clone())
            .unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn schedule(&mut self, alert: &Alert) -> Result<(), NotifyError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| NotifyError::Unavailable("poisoned".into()))?;
        if inner.denied {
            return Err(NotifyError::PermissionDenied);
        }
        inner.pending.push(alert.clone());
        inner.delivered.push(alert.clone());
        Ok(())
    }

    fn cancel_all(&mut self) -> Result<(), NotifyError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| NotifyError::Unavailable("poisoned".into()))?;
        inner.pending.clear();
        Ok(())
    }
}
