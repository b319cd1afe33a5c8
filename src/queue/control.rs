//! Cooperative pause and cancellation.
//!
//! One [`QueueControl`] is owned by each queue and shared with its workers.
//! Nothing is interrupted preemptively: the processor loop and every progress
//! report check the flags, and a [`Notify`] wakes whoever is waiting on them.

use crate::error::{Error, Result};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Pause and cancel flags for one queue.
#[derive(Debug, Default)]
pub struct QueueControl {
    paused: AtomicBool,
    cancelled: AtomicBool,
    /// Token of the running batch; replaced when a new batch starts.
    token: Mutex<CancellationToken>,
    changed: Notify,
}

impl QueueControl {
    /// Create a control with both flags cleared.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop admitting items and hold in-flight transfers at their next
    /// progress report.
    pub fn pause(&self) {
        self.set_paused(true);
    }

    /// Undo [`pause`](Self::pause).
    pub fn resume(&self) {
        self.set_paused(false);
    }

    /// Set the pause flag.
    pub fn set_paused(&self, paused: bool) {
        let was = self.paused.swap(paused, Ordering::SeqCst);
        if was != paused {
            debug!(paused, "pause toggled");
        }
        self.notify();
    }

    /// Request cancellation of the running batch.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            debug!("cancellation requested");
        }
        self.lock_token().cancel();
        self.notify();
    }

    /// Whether the pause flag is set.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Token that fires when the running batch is cancelled.
    pub fn token(&self) -> CancellationToken {
        self.lock_token().clone()
    }

    /// Suspend while paused.
    ///
    /// Returns [`Error::Aborted`] as soon as cancellation is observed, whether
    /// or not the queue is paused. `poll` bounds how long a missed wake-up can
    /// delay the re-check.
    pub async fn wait_while_paused(&self, poll: Duration) -> Result<()> {
        loop {
            let changed = self.notified();
            tokio::pin!(changed);
            changed.as_mut().enable();

            if self.is_cancelled() {
                return Err(Error::Aborted);
            }
            if !self.is_paused() {
                return Ok(());
            }
            let _ = tokio::time::timeout(poll, changed).await;
        }
    }

    /// Clear both flags and arm a fresh token for a new batch.
    pub(crate) fn reset(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.cancelled.store(false, Ordering::SeqCst);
        *self.lock_token() = CancellationToken::new();
    }

    /// Wake everything waiting on a state change.
    pub(crate) fn notify(&self) {
        self.changed.notify_waiters();
    }

    /// Future resolving on the next [`notify`](Self::notify).
    pub(crate) fn notified(&self) -> Notified<'_> {
        self.changed.notified()
    }

    fn lock_token(&self) -> MutexGuard<'_, CancellationToken> {
        self.token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
