//! Bounded admission for concurrently running work units.
//!
//! The active count is reserved with a CAS loop so the fast path never takes
//! a lock. Waiters park on a condvar that every release notifies, which lets a
//! slot freed by one pool wake a controller admitting units for another.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Counting gate shared by every pool run of one scheduler.
#[derive(Debug)]
pub struct ConcurrencyGate {
    max: usize,
    active: AtomicUsize,
    wake: Mutex<()>,
    freed: Condvar,
}

/// A reserved slot. Dropping it releases the slot and wakes waiters.
#[derive(Debug)]
#[must_use = "dropping a permit immediately releases its slot"]
pub struct GatePermit {
    gate: Arc<ConcurrencyGate>,
}

impl ConcurrencyGate {
    /// Create a gate admitting at most `max` units at a time.
    #[must_use]
    pub const fn new(max: usize) -> Self {
        Self {
            max,
            active: AtomicUsize::new(0),
            wake: Mutex::new(()),
            freed: Condvar::new(),
        }
    }

    /// Configured capacity.
    #[must_use]
    pub const fn max(&self) -> usize {
        self.max
    }

    /// Units currently holding a permit.
    #[must_use]
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Whether a permit could be taken right now.
    #[must_use]
    pub fn has_capacity(&self) -> bool {
        self.active() < self.max
    }

    /// Reserve a slot if `active < max`, without blocking.
    pub fn try_acquire(self: &Arc<Self>) -> Option<GatePermit> {
        let mut current = self.active.load(Ordering::Acquire);
        loop {
            if current >= self.max {
                return None;
            }
            match self.active.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return Some(GatePermit {
                        gate: Arc::clone(self),
                    })
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Reserve a slot, waiting at most `timeout` for one to be released.
    pub fn acquire_timeout(self: &Arc<Self>, timeout: Duration) -> Option<GatePermit> {
        if let Some(permit) = self.try_acquire() {
            return Some(permit);
        }
        let mut guard = self.wake.lock();
        // Re-check under the lock: a release between the first attempt and
        // here would otherwise be missed.
        if let Some(permit) = self.try_acquire() {
            return Some(permit);
        }
        self.freed.wait_for(&mut guard, timeout);
        drop(guard);
        self.try_acquire()
    }

    fn release(&self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
        let _guard = self.wake.lock();
        self.freed.notify_all();
    }
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.gate.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_admission_is_strictly_less_than_max() {
        let gate = Arc::new(ConcurrencyGate::new(2));
        let first = gate.try_acquire().unwrap();
        let second = gate.try_acquire().unwrap();
        assert_eq!(gate.active(), 2);
        assert!(gate.try_acquire().is_none());

        drop(first);
        assert_eq!(gate.active(), 1);
        let third = gate.try_acquire();
        assert!(third.is_some());
        drop(second);
        drop(third);
        assert_eq!(gate.active(), 0);
    }

    #[test]
    fn test_zero_capacity_never_admits() {
        let gate = Arc::new(ConcurrencyGate::new(0));
        assert!(gate.try_acquire().is_none());
        assert!(gate.acquire_timeout(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn test_acquire_timeout_wakes_on_release() {
        let gate = Arc::new(ConcurrencyGate::new(1));
        let held = gate.try_acquire().unwrap();

        let releaser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            drop(held);
        });

        let start = Instant::now();
        let permit = gate.acquire_timeout(Duration::from_secs(10));
        assert!(permit.is_some());
        assert!(start.elapsed() < Duration::from_secs(5));
        releaser.join().unwrap();
    }

    #[test]
    fn test_concurrent_acquire_respects_bound() {
        let gate = Arc::new(ConcurrencyGate::new(3));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();

        for _ in 0..12 {
            let gate = Arc::clone(&gate);
            let peak = Arc::clone(&peak);
            handles.push(thread::spawn(move || loop {
                if let Some(permit) = gate.acquire_timeout(Duration::from_millis(50)) {
                    peak.fetch_max(gate.active(), Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(5));
                    drop(permit);
                    break;
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(gate.active(), 0);
    }
}
