//! Repeating narration until acknowledged

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::device::Narrator;

/// Snooze-style alarm: narrate, wait, repeat until stopped
///
/// Each run owns its own flag, so a stop followed by a fresh start never
/// revives the previous loop. Cancellation is observed at the next repeat
/// boundary.
#[derive(Debug, Default)]
pub struct Alarm {
    current: Mutex<Option<Arc<AtomicBool>>>,
}

impl Alarm {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<AtomicBool>>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start the loop unless one is already running
    ///
    /// Must be called inside a tokio runtime. Returns false when an alarm
    /// was already active.
    pub fn start(&self, narrator: Arc<dyn Narrator>, message: String, interval: Duration) -> bool {
        let mut current = self.lock();
        if current.as_ref().is_some_and(|flag| flag.load(Ordering::SeqCst)) {
            return false;
        }

        let active = Arc::new(AtomicBool::new(true));
        *current = Some(Arc::clone(&active));
        drop(current);

        tracing::info!(%message, interval_secs = interval.as_secs(), "Alarm started");
        tokio::spawn(async move {
            while active.load(Ordering::SeqCst) {
                narrator.speak(&message).await;
                tokio::time::sleep(interval).await;
            }
            tracing::debug!("Alarm loop exited");
        });
        true
    }

    /// Stop the active alarm; false when none was running
    pub fn stop(&self) -> bool {
        let stopped = self
            .lock()
            .take()
            .is_some_and(|flag| flag.swap(false, Ordering::SeqCst));
        if stopped {
            tracing::info!("Alarm stopped");
        }
        stopped
    }

    pub fn is_active(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}
