//! Dedicated OS thread per admitted work unit.
//!
//! Each admitted unit gets its own thread with a single-threaded tokio
//! runtime, so a blocking task body cannot stall the controller or other
//! units. The gate permit travels with the thread and is released, followed
//! by a signal notification, when the thread finishes for any reason.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info_span, Span};

use crate::core::gate::GatePermit;
use crate::core::messenger::Messenger;
use crate::core::signal::Signal;
use crate::core::status::Status;
use crate::core::work_unit::WorkUnit;
use crate::core::SchedulerError;

/// Releases the permit, marks the thread done, then wakes the controller.
struct Completion {
    permit: Option<GatePermit>,
    done: Arc<AtomicBool>,
    signal: Arc<Signal>,
}

impl Drop for Completion {
    fn drop(&mut self) {
        drop(self.permit.take());
        self.done.store(true, Ordering::Release);
        self.signal.notify();
    }
}

/// A running unit thread.
#[derive(Debug)]
pub struct UnitThread {
    name: String,
    done: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl UnitThread {
    /// Unit name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the unit has finished and released its permit.
    ///
    /// Becomes true before the notification is sent, so a controller woken
    /// by the signal always observes it.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.done.load(Ordering::Acquire) || self.handle.is_finished()
    }

    /// Wait for the thread to exit.
    pub fn join(self) {
        // Panics are caught inside the thread; an Err here cannot carry a task failure.
        if self.handle.join().is_err() {
            error!(worker = %self.name, "unit thread panicked outside the task body");
        }
    }
}

/// Run `unit` on a new thread holding `permit` until it finishes.
///
/// A task panic or a runtime that cannot be built leaves the unit `Failed`.
pub fn spawn_unit(
    unit: WorkUnit,
    permit: GatePermit,
    signal: Arc<Signal>,
    messenger: Arc<Messenger>,
    parent: &Span,
) -> Result<UnitThread, SchedulerError> {
    let name = unit.name().to_string();
    let span = info_span!(parent: parent, "work_unit", worker = %name);
    let done = Arc::new(AtomicBool::new(false));
    let completion = Completion {
        permit: Some(permit),
        done: Arc::clone(&done),
        signal,
    };

    let handle = thread::Builder::new()
        .name(name.clone())
        .spawn(move || {
            let _completion = completion;
            let _entered = span.enter();
            debug!("unit thread started");

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!(error = %e, "failed to create unit runtime");
                        return;
                    }
                };
                rt.block_on(unit.run_observed(&messenger));
            }));

            if outcome.is_err() {
                error!("task panicked");
                messenger.worker_error(unit.name(), &"task panicked", true);
            }
            if unit.status().is_open() {
                unit.set_status(Status::Failed);
            }
            debug!(status = %unit.status(), "unit thread exiting");
        })
        .map_err(|source| SchedulerError::Spawn {
            name: name.clone(),
            source,
        })?;

    Ok(UnitThread { name, done, handle })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::executor::blocking_fn;
    use crate::core::gate::ConcurrencyGate;
    use std::time::Duration;

    fn run(unit: &WorkUnit) -> (Arc<ConcurrencyGate>, Arc<Signal>) {
        let gate = Arc::new(ConcurrencyGate::new(1));
        let signal = Arc::new(Signal::new(Duration::from_millis(50)));
        let permit = gate.try_acquire().unwrap();
        let thread = spawn_unit(
            unit.clone(),
            permit,
            Arc::clone(&signal),
            Arc::new(Messenger::default()),
            &Span::none(),
        )
        .unwrap();
        assert_eq!(thread.name(), unit.name());
        thread.join();
        (gate, signal)
    }

    #[test]
    fn test_success_releases_permit_and_notifies() {
        let unit = WorkUnit::new("ok", blocking_fn(|| Ok(())));
        let (gate, signal) = run(&unit);
        assert_eq!(unit.status(), Status::Success);
        assert_eq!(gate.active(), 0);
        assert!(signal.wait_for(Duration::ZERO));
    }

    #[test]
    fn test_panic_marks_failed() {
        let unit = WorkUnit::new("boom", blocking_fn(|| panic!("boom")));
        let (gate, _) = run(&unit);
        assert_eq!(unit.status(), Status::Failed);
        assert_eq!(gate.active(), 0);
    }

    #[test]
    fn test_thread_is_named_after_unit() {
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let slot = Arc::clone(&seen);
        let unit = WorkUnit::new(
            "named-unit",
            blocking_fn(move || {
                *slot.lock() = thread::current().name().map(ToString::to_string);
                Ok(())
            }),
        );
        run(&unit);
        assert_eq!(seen.lock().as_deref(), Some("named-unit"));
    }
}
