//! Single-slot completion signal with a bounded wait.
//!
//! Every admitted unit notifies its round's [`Signal`] exactly once when it
//! finishes. The controlling thread waits on it while units are still
//! waiting on dependencies and while it joins the round. A notification that
//! arrives while nobody waits is remembered, so the next `wait` returns
//! immediately instead of sleeping through it.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Re-poll interval used when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Wait/notify primitive with a remembered notification and a timeout.
#[derive(Debug)]
pub struct Signal {
    notified: Mutex<bool>,
    condvar: Condvar,
    poll_interval: Duration,
}

impl Signal {
    /// Create a signal whose waits never block longer than `poll_interval`.
    #[must_use]
    pub const fn new(poll_interval: Duration) -> Self {
        Self {
            notified: Mutex::new(false),
            condvar: Condvar::new(),
            poll_interval,
        }
    }

    /// The bound applied to every wait.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Block until notified or the poll interval elapses.
    ///
    /// Returns `true` when a notification was consumed.
    pub fn wait(&self) -> bool {
        self.wait_for(self.poll_interval)
    }

    /// Block until notified or `timeout` (capped at the poll interval) elapses.
    ///
    /// Returns `true` when a notification was consumed.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let timeout = timeout.min(self.poll_interval);
        let mut notified = self.notified.lock();
        if !*notified {
            self.condvar.wait_for(&mut notified, timeout);
        }
        std::mem::replace(&mut *notified, false)
    }

    /// Wake one waiter and remember the notification.
    pub fn notify(&self) {
        let mut notified = self.notified.lock();
        *notified = true;
        self.condvar.notify_one();
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}
