//! Transient user notifications with owned, cancellable dismiss timers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{info, warn};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
}

/// Holds the notification currently on screen.
///
/// Each [`show`](Self::show) replaces the visible message and restarts the
/// dismiss timer. Timers are aborted when replaced and when the center is
/// dropped, so none outlives its owner.
pub struct NotificationCenter {
    current: Arc<Mutex<Option<Notification>>>,
    generation: Arc<AtomicU64>,
    timer: Mutex<Option<JoinHandle<()>>>,
    duration: Duration,
}

impl NotificationCenter {
    pub fn new(duration: Duration) -> Self {
        NotificationCenter {
            current: Arc::new(Mutex::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
            timer: Mutex::new(None),
            duration,
        }
    }

    pub fn success(&self, message: impl Into<String>) {
        self.show(message, NotificationKind::Success);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.show(message, NotificationKind::Error);
    }

    pub fn show(&self, message: impl Into<String>, kind: NotificationKind) {
        let message = message.into();
        match kind {
            NotificationKind::Success => info!("Notification: {message}"),
            NotificationKind::Error => warn!("Notification: {message}"),
        }

        self.cancel_timer();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut current) = self.current.lock() {
            *current = Some(Notification { message, kind });
        }

        // Without a runtime the message simply stays until replaced.
        let Ok(handle) = Handle::try_current() else {
            return;
        };
        let current = Arc::clone(&self.current);
        let latest = Arc::clone(&self.generation);
        let duration = self.duration;
        let task = handle.spawn(async move {
            tokio::time::sleep(duration).await;
            if latest.load(Ordering::SeqCst) == generation {
                if let Ok(mut current) = current.lock() {
                    *current = None;
                }
            }
        });
        if let Ok(mut timer) = self.timer.lock() {
            *timer = Some(task);
        }
    }

    pub fn current(&self) -> Option<Notification> {
        self.current.lock().ok().and_then(|current| current.clone())
    }

    pub fn dismiss(&self) {
        self.cancel_timer();
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut current) = self.current.lock() {
            *current = None;
        }
    }

    fn cancel_timer(&self) {
        if let Ok(mut timer) = self.timer.lock() {
            if let Some(task) = timer.take() {
                task.abort();
            }
        }
    }
}

impl Drop for NotificationCenter {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}
