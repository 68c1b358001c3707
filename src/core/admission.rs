//! Per-pool admission loop.
//!
//! One controller thread drives a pool run: it walks the units in
//! registration order, admits ready ones through the shared
//! [`ConcurrencyGate`], parks dependency-blocked ones on a waiting list that
//! is re-evaluated whenever a unit finishes, and finally joins everything it
//! admitted. Rounds repeat under the pool's retry policy.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info_span, warn, Span};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::runtime::unit_thread::{spawn_unit, UnitThread};
use crate::util::Stopwatch;

use super::gate::{ConcurrencyGate, GatePermit};
use super::messenger::{Messenger, RetryScope};
use super::pool::{Pool, Readiness};
use super::signal::Signal;
use super::status::Status;
use super::work_unit::WorkUnit;

/// Shared collaborators for every pool run of one scheduler.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Read-only run configuration.
    pub config: Arc<SchedulerConfig>,
    /// Global admission gate.
    pub gate: Arc<ConcurrencyGate>,
    /// Log message sink.
    pub messenger: Arc<Messenger>,
}

impl RunContext {
    /// Build a context with a fresh gate sized from `config`.
    #[must_use]
    pub fn new(config: SchedulerConfig, messenger: Messenger) -> Self {
        let gate = Arc::new(ConcurrencyGate::new(config.max_concurrent));
        Self {
            config: Arc::new(config),
            gate,
            messenger: Arc::new(messenger),
        }
    }
}

/// Run `pool` to completion, including pool-level retries.
///
/// Blocks the calling thread. Returns the pool's final composite status.
pub fn run_pool(pool: &Pool, ctx: &RunContext) -> Status {
    if pool.is_empty() {
        ctx.messenger.pool_empty(pool.name());
        return Status::Empty;
    }

    let mut watch = Stopwatch::started();
    let policy = pool.retry();
    let mut attempt = 0;
    let status = loop {
        Round::new(pool, ctx).run();
        let status = pool.status();
        if status == Status::Success || attempt >= policy.attempts {
            break status;
        }
        attempt += 1;
        ctx.messenger
            .retry(RetryScope::Pool, pool.name(), policy.attempts, attempt, policy.wait);
        thread::sleep(policy.wait);
        pool.reset_for_retry();
    };
    watch.stop();

    ctx.messenger
        .pool_complete(pool.name(), status, &watch, &pool.detail());
    status
}

/// One pass over a pool: admission followed by join.
struct Round<'a> {
    pool: &'a Pool,
    ctx: &'a RunContext,
    signal: Arc<Signal>,
    span: Span,
    threads: Vec<UnitThread>,
    halted: bool,
}

impl<'a> Round<'a> {
    fn new(pool: &'a Pool, ctx: &'a RunContext) -> Self {
        let run_id = Uuid::new_v4();
        Self {
            pool,
            ctx,
            signal: Arc::new(Signal::new(ctx.config.poll_interval())),
            span: info_span!("pool_run", pool = pool.name(), run_id = %run_id),
            threads: Vec::new(),
            halted: false,
        }
    }

    fn run(mut self) {
        let span = self.span.clone();
        let _entered = span.enter();
        self.ctx
            .messenger
            .pool_start(self.pool.name(), &self.pool.detail());
        self.admit_all();
        self.join_all();
    }

    fn admit_all(&mut self) {
        let pool = self.pool;
        let mut waiting: Vec<&WorkUnit> = Vec::new();

        for unit in pool.units() {
            if self.check_halt() {
                return;
            }
            if unit.status() != Status::Pending {
                continue;
            }
            match pool.evaluate_readiness(unit) {
                Readiness::Ready => self.admit(unit),
                Readiness::Waiting => waiting.push(unit),
                Readiness::PrecedenceFailed => {
                    debug!(worker = unit.name(), "dependency failed; not running");
                }
            }
        }

        while !waiting.is_empty() {
            if self.check_halt() {
                return;
            }
            let before = waiting.len();
            let mut still_waiting = Vec::with_capacity(before);
            for unit in waiting {
                if self.halted || unit.status() != Status::Pending {
                    continue;
                }
                match pool.evaluate_readiness(unit) {
                    Readiness::Ready => {
                        if !self.check_halt() {
                            self.admit(unit);
                        }
                    }
                    Readiness::Waiting => still_waiting.push(unit),
                    Readiness::PrecedenceFailed => {
                        debug!(worker = unit.name(), "dependency failed; not running");
                    }
                }
            }
            waiting = still_waiting;
            if !waiting.is_empty() && waiting.len() == before {
                self.prune();
                if self.threads.is_empty() {
                    let stalled = waiting
                        .iter()
                        .all(|u| pool.evaluate_readiness(u) == Readiness::Waiting);
                    if stalled {
                        // Nothing running can unblock them: the dependencies form a cycle.
                        let stuck: Vec<&str> = waiting.iter().map(|u| u.name()).collect();
                        warn!(pool = pool.name(), ?stuck, "units can never become ready");
                        return;
                    }
                    continue;
                }
                self.signal.wait();
            }
        }
    }

    /// Halt admission once a unit failed, if configured. Logs the first time.
    fn check_halt(&mut self) -> bool {
        if !self.halted
            && self.ctx.config.stop_admission_on_failure
            && self.pool.status() == Status::Failed
        {
            self.halted = true;
            self.ctx.messenger.pool_stop_admission(self.pool.name());
        }
        self.halted
    }

    fn admit(&mut self, unit: &WorkUnit) {
        let permit = self.wait_for_capacity();
        match spawn_unit(
            unit.clone(),
            permit,
            Arc::clone(&self.signal),
            Arc::clone(&self.ctx.messenger),
            &self.span,
        ) {
            Ok(thread) => self.threads.push(thread),
            Err(e) => {
                error!(worker = unit.name(), error = %e, "could not start unit");
                unit.transition(Status::Pending, Status::Failed);
            }
        }
    }

    fn wait_for_capacity(&mut self) -> GatePermit {
        let poll = self.ctx.config.poll_interval();
        loop {
            self.prune();
            if let Some(permit) = self.ctx.gate.acquire_timeout(poll) {
                return permit;
            }
            debug!(
                active = self.ctx.gate.active(),
                max = self.ctx.gate.max(),
                "waiting for capacity"
            );
        }
    }

    /// Join threads whose unit has already finished.
    fn prune(&mut self) {
        let (finished, running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.threads)
            .into_iter()
            .partition(UnitThread::is_finished);
        self.threads = running;
        for thread in finished {
            thread.join();
        }
    }

    fn join_all(&mut self) {
        let mut heartbeat = Heartbeat::new(
            self.ctx.config.status_interval(),
            self.ctx.config.warn_interval(),
        );
        loop {
            self.prune();
            if self.threads.is_empty() {
                return;
            }
            self.signal.wait_for(heartbeat.until_due());
            if let Some(long_running) = heartbeat.tick() {
                self.ctx.messenger.pool_heartbeat(
                    self.pool.name(),
                    heartbeat.watch(),
                    &self.pool.detail(),
                    long_running,
                );
            }
        }
    }
}

/// Cadence of "still running" messages while a round is being joined.
#[derive(Debug)]
pub(crate) struct Heartbeat {
    watch: Stopwatch,
    info_every: Duration,
    warn_every: Duration,
    last_info: Duration,
    last_warn: Duration,
}

impl Heartbeat {
    pub(crate) fn new(info_every: Duration, warn_every: Duration) -> Self {
        Self {
            watch: Stopwatch::started(),
            info_every,
            warn_every,
            last_info: Duration::ZERO,
            last_warn: Duration::ZERO,
        }
    }

    pub(crate) const fn watch(&self) -> &Stopwatch {
        &self.watch
    }

    /// Time until the next message is due, at least one millisecond.
    pub(crate) fn until_due(&self) -> Duration {
        self.until_due_at(self.watch.elapsed())
    }

    /// `Some(true)` for a warning, `Some(false)` for an info message.
    pub(crate) fn tick(&mut self) -> Option<bool> {
        self.tick_at(self.watch.elapsed())
    }

    fn until_due_at(&self, elapsed: Duration) -> Duration {
        let info = (self.last_info + self.info_every).saturating_sub(elapsed);
        let warn = (self.last_warn + self.warn_every).saturating_sub(elapsed);
        info.min(warn).max(Duration::from_millis(1))
    }

    fn tick_at(&mut self, elapsed: Duration) -> Option<bool> {
        if elapsed.saturating_sub(self.last_warn) >= self.warn_every {
            self.last_warn = elapsed;
            self.last_info = elapsed;
            Some(true)
        } else if elapsed.saturating_sub(self.last_info) >= self.info_every {
            self.last_info = elapsed;
            Some(false)
        } else {
            None
        }
    }
}
