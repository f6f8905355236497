//! Delivery seam for local notifications. The scheduler decides *when*;
//! implementations here only deliver (or swallow) at fire time.

use crate::reminders::Reminder;
use chrono::Local;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::task::AbortHandle;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification backend: {0}")]
    Backend(String),
}

pub trait Notifier: Send + Sync {
    /// Schedule a reminder; returns the platform identifier that cancels it.
    fn schedule(&self, reminder: &Reminder) -> Result<String, NotifyError>;

    /// Best-effort cancel. Unknown ids (e.g. recorded by a previous run of
    /// the process) are ignored.
    fn cancel(&self, id: &str);
}

/// Swallows everything. Selected when notifications are disabled.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn schedule(&self, _reminder: &Reminder) -> Result<String, NotifyError> {
        Ok(Uuid::new_v4().to_string())
    }

    fn cancel(&self, _id: &str) {}
}

/// Fires reminders with a tokio timer and hands them to the desktop
/// notification daemon. Timers die with the process; stale ids from the
/// ledger simply cancel to nothing on the next run.
///
/// Must be used inside a tokio runtime.
pub struct TimerNotifier {
    pending: Arc<Mutex<HashMap<String, AbortHandle>>>,
}

impl TimerNotifier {
    pub fn new() -> Self {
        TimerNotifier { pending: Arc::new(Mutex::new(HashMap::new())) }
    }

    #[cfg(test)]
    fn pending_count(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }
}

impl Default for TimerNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for TimerNotifier {
    fn schedule(&self, reminder: &Reminder) -> Result<String, NotifyError> {
        let delay = (reminder.fire_at - Local::now()).to_std().unwrap_or_default();
        let id = Uuid::new_v4().to_string();

        let pending = Arc::clone(&self.pending);
        let key = id.clone();
        let title = reminder.title.clone();
        let body = reminder.body.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            show_desktop(&title, &body);
            if let Ok(mut pending) = pending.lock() {
                pending.remove(&key);
            }
        });

        self.pending
            .lock()
            .map_err(|_| NotifyError::Backend("pending map poisoned".to_string()))?
            .insert(id.clone(), handle.abort_handle());
        Ok(id)
    }

    fn cancel(&self, id: &str) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(handle) = pending.remove(id) {
                handle.abort();
            }
        }
    }
}

#[cfg(target_os = "linux")]
fn show_desktop(title: &str, body: &str) {
    if let Err(err) = notify_rust::Notification::new()
        .summary(title)
        .body(body)
        .show()
    {
        tracing::warn!(%err, "failed to show notification");
    }
}

#[cfg(not(target_os = "linux"))]
fn show_desktop(title: &str, body: &str) {
    tracing::info!(title, body, "reminder fired (no desktop backend on this platform)");
}

/// Set TAREFA_DISABLE_NOTIFICATIONS to route everything through the no-op
/// notifier (headless machines, tests).
pub fn notifier_from_env() -> Box<dyn Notifier> {
    if std::env::var("TAREFA_DISABLE_NOTIFICATIONS").is_ok() {
        return Box::new(NoopNotifier);
    }
    Box::new(TimerNotifier::new())
}

// ── Tests ──────────────────────────────────────────────────────
