//! Top-level orchestrator owning pools and global run configuration.
//!
//! Configuration (adding pools and units, applying a run filter) needs
//! `&mut Scheduler`. Running and querying only need `&Scheduler`, so a
//! scheduler shared behind an `Arc` can be started and joined from several
//! threads; the running registry rejects a second start of the same pool.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::builders::handles::{PoolHandle, WorkerHandle};
use crate::config::{MessageTemplates, SchedulerConfig};
use crate::runtime::report::{PoolReport, SchedulerReport};
use crate::util::Stopwatch;

use super::admission::{run_pool, RunContext};
use super::error::SchedulerError;
use super::filter::RunFilter;
use super::messenger::Messenger;
use super::pool::Pool;
use super::status::Status;
use super::validate::validate;
use super::work_unit::WorkUnit;

/// Result of a start call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Composite status of the requested pools.
    pub status: Status,
    /// Requested pools whose status is failed.
    pub failed_pools: Vec<String>,
    /// Set when `exit_on_error` is configured and `status` is `Failed`.
    pub terminal_failure: bool,
}

impl RunOutcome {
    /// Process exit code the caller should use, if the run is terminal.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        if self.terminal_failure {
            Some(1)
        } else {
            None
        }
    }

    /// Whether every requested pool succeeded (or was empty).
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, Status::Success | Status::Empty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Running,
    Done,
    Interrupted,
}

/// Completion latch for one pool run.
#[derive(Debug)]
struct PoolRun {
    state: Mutex<RunState>,
    changed: Condvar,
}

impl PoolRun {
    const fn new() -> Self {
        Self {
            state: Mutex::new(RunState::Running),
            changed: Condvar::new(),
        }
    }

    fn complete(&self, state: RunState) {
        let mut current = self.state.lock();
        if *current == RunState::Running {
            *current = state;
        }
        self.changed.notify_all();
    }

    /// Wait until the run ends or `deadline` passes. Returns the last state seen.
    fn wait_until(&self, deadline: Option<Instant>, poll: Duration) -> RunState {
        let mut state = self.state.lock();
        while *state == RunState::Running {
            let slice = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        break;
                    }
                    remaining.min(poll)
                }
                None => poll,
            };
            self.changed.wait_for(&mut state, slice);
        }
        *state
    }
}

type Registry = Arc<Mutex<HashMap<String, Arc<PoolRun>>>>;

/// Pools marked as running by one start call. Dropping it clears the marks.
struct Registration {
    registry: Registry,
    runs: Vec<(String, Arc<PoolRun>)>,
}

impl Registration {
    /// Mark every name as running, or none if any already is.
    fn acquire(registry: &Registry, names: &[String]) -> Result<Self, SchedulerError> {
        let mut running = registry.lock();
        if let Some(busy) = names.iter().find(|n| running.contains_key(n.as_str())) {
            return Err(SchedulerError::AlreadyRunning(busy.clone()));
        }
        let mut runs = Vec::with_capacity(names.len());
        for name in names {
            if runs.iter().any(|(n, _)| n == name) {
                continue;
            }
            let run = Arc::new(PoolRun::new());
            running.insert(name.clone(), Arc::clone(&run));
            runs.push((name.clone(), run));
        }
        drop(running);
        Ok(Self {
            registry: Arc::clone(registry),
            runs,
        })
    }

    /// Split into one registration per pool.
    fn split(mut self) -> Vec<Self> {
        std::mem::take(&mut self.runs)
            .into_iter()
            .map(|run| Self {
                registry: Arc::clone(&self.registry),
                runs: vec![run],
            })
            .collect()
    }

    /// Mark `name` finished.
    fn finish(&mut self, name: &str) {
        if let Some(pos) = self.runs.iter().position(|(n, _)| n == name) {
            let (name, run) = self.runs.swap_remove(pos);
            self.release(&name, &run, RunState::Done);
        }
    }

    fn release(&self, name: &str, run: &Arc<PoolRun>, state: RunState) {
        {
            let mut running = self.registry.lock();
            if running.get(name).is_some_and(|r| Arc::ptr_eq(r, run)) {
                running.remove(name);
            }
        }
        run.complete(state);
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        let state = if thread::panicking() {
            RunState::Interrupted
        } else {
            RunState::Done
        };
        for (name, run) in std::mem::take(&mut self.runs) {
            self.release(&name, &run, state);
        }
    }
}

/// Owns pools and drives their runs.
///
/// # Example
///
/// ```rust,ignore
/// use std::time::Duration;
/// use prometheus_workpool::config::SchedulerConfig;
/// use prometheus_workpool::core::{blocking_fn, Scheduler, WorkUnit};
///
/// let mut scheduler = Scheduler::new(SchedulerConfig::new().with_max_concurrent(4))?;
/// let mut etl = scheduler.add_pool("etl")?;
/// etl.retry(1, Duration::from_secs(30), false);
/// etl.add_worker(WorkUnit::new("extract", blocking_fn(extract)));
/// etl.add_worker(WorkUnit::new("load", blocking_fn(load))).depends_on("extract");
///
/// let outcome = scheduler.start()?;
/// if let Some(code) = outcome.exit_code() {
///     std::process::exit(code);
/// }
/// ```
#[derive(Debug)]
pub struct Scheduler {
    ctx: RunContext,
    pools: HashMap<String, Pool>,
    order: Vec<String>,
    pending: Mutex<Vec<String>>,
    running: Registry,
}

impl Scheduler {
    /// Create a scheduler with default message templates.
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        Self::with_messages(config, MessageTemplates::default())
    }

    /// Create a scheduler with custom message templates.
    pub fn with_messages(
        config: SchedulerConfig,
        templates: MessageTemplates,
    ) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidConfig)?;
        Ok(Self {
            ctx: RunContext::new(config, Messenger::new(templates)),
            pools: HashMap::new(),
            order: Vec::new(),
            pending: Mutex::new(Vec::new()),
            running: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Run configuration.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.ctx.config
    }

    /// Units currently holding a concurrency slot, across all pools.
    #[must_use]
    pub fn active_units(&self) -> usize {
        self.ctx.gate.active()
    }

    // ---- configuration -------------------------------------------------

    /// Register an empty pool and return a handle to it.
    pub fn add_pool(&mut self, name: impl Into<String>) -> Result<PoolHandle<'_>, SchedulerError> {
        let name = name.into();
        if self.pools.contains_key(&name) {
            return Err(SchedulerError::DuplicatePool(name));
        }
        self.order.push(name.clone());
        self.pending.lock().push(name.clone());
        let pool = self.pools.entry(name.clone()).or_insert_with(|| Pool::new(name));
        Ok(PoolHandle::new(pool))
    }

    /// Handle to a registered pool.
    pub fn pool_mut(&mut self, name: &str) -> Result<PoolHandle<'_>, SchedulerError> {
        self.pools
            .get_mut(name)
            .map(PoolHandle::new)
            .ok_or_else(|| SchedulerError::UnknownPool(name.to_string()))
    }

    /// Append a unit to a registered pool.
    pub fn add_worker(
        &mut self,
        pool: &str,
        unit: WorkUnit,
    ) -> Result<WorkerHandle<'_>, SchedulerError> {
        let pool = self
            .pools
            .get_mut(pool)
            .ok_or_else(|| SchedulerError::UnknownPool(pool.to_string()))?;
        let index = pool.push(unit);
        Ok(WorkerHandle::new(pool, index))
    }

    /// Handle to a registered unit, searched across pools in registration order.
    pub fn worker_mut(&mut self, name: &str) -> Result<WorkerHandle<'_>, SchedulerError> {
        let pool_name = self
            .order
            .iter()
            .find(|p| self.pools.get(p.as_str()).and_then(|p| p.unit(name)).is_some())
            .cloned()
            .ok_or_else(|| SchedulerError::UnknownWorker(name.to_string()))?;
        let pool = self
            .pools
            .get_mut(&pool_name)
            .ok_or(SchedulerError::UnknownPool(pool_name))?;
        let index = pool
            .position(name)
            .ok_or_else(|| SchedulerError::UnknownWorker(name.to_string()))?;
        Ok(WorkerHandle::new(pool, index))
    }

    /// Apply run-selection tokens to every pool. Returns removed unit names.
    pub fn apply_run_filter<I, S>(&mut self, tokens: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let filter = RunFilter::parse(tokens);
        let mut pools: Vec<&mut Pool> = Vec::with_capacity(self.order.len());
        // Registration order.
        let mut by_name: HashMap<&str, &mut Pool> =
            self.pools.iter_mut().map(|(k, v)| (k.as_str(), v)).collect();
        for name in &self.order {
            if let Some(pool) = by_name.remove(name.as_str()) {
                pools.push(pool);
            }
        }
        let removed = filter.apply(pools);
        debug!(removed = removed.len(), "run filter applied");
        removed
    }

    // ---- lookups -------------------------------------------------------

    /// A registered pool.
    #[must_use]
    pub fn pool(&self, name: &str) -> Option<&Pool> {
        self.pools.get(name)
    }

    /// A registered unit, searched across pools in registration order.
    #[must_use]
    pub fn worker(&self, name: &str) -> Option<&WorkUnit> {
        self.ordered_pools().find_map(|p| p.unit(name))
    }

    /// Pool names in registration order.
    #[must_use]
    pub fn pool_names(&self) -> &[String] {
        &self.order
    }

    /// Pools that have not been run yet, in registration order.
    #[must_use]
    pub fn pending_pools(&self) -> Vec<String> {
        self.pending.lock().clone()
    }

    /// Whether a start call is currently running `pool`.
    #[must_use]
    pub fn is_running(&self, pool: &str) -> bool {
        self.running.lock().contains_key(pool)
    }

    fn ordered_pools(&self) -> impl Iterator<Item = &Pool> {
        self.order.iter().filter_map(|name| self.pools.get(name))
    }

    fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<String>, SchedulerError> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                if self.pools.contains_key(name) {
                    Ok(name.to_string())
                } else {
                    Err(SchedulerError::UnknownPool(name.to_string()))
                }
            })
            .collect()
    }

    fn pool_ref(&self, name: &str) -> Result<&Pool, SchedulerError> {
        self.pools
            .get(name)
            .ok_or_else(|| SchedulerError::UnknownPool(name.to_string()))
    }

    // ---- status --------------------------------------------------------

    /// Composite status of one pool.
    pub fn status(&self, pool: &str) -> Result<Status, SchedulerError> {
        self.pool_ref(pool).map(Pool::status)
    }

    /// Composite status of several pools.
    pub fn status_of<S: AsRef<str>>(&self, pools: &[S]) -> Result<Status, SchedulerError> {
        let statuses = pools
            .iter()
            .map(|name| self.status(name.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Status::aggregate(statuses))
    }

    /// Composite status of every registered pool.
    #[must_use]
    pub fn status_all(&self) -> Status {
        Status::aggregate(self.ordered_pools().map(Pool::status))
    }

    /// The named pools whose status is failed. Unknown names are skipped.
    #[must_use]
    pub fn failed_pools<S: AsRef<str>>(&self, pools: &[S]) -> Vec<String> {
        pools
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| self.pools.get(*name).is_some_and(|p| p.status().is_failed()))
            .map(ToString::to_string)
            .collect()
    }

    /// Snapshot of every pool and unit.
    #[must_use]
    pub fn report(&self) -> SchedulerReport {
        SchedulerReport::from_pools(
            self.ordered_pools()
                .map(|pool| PoolReport::capture(pool, self.is_running(pool.name())))
                .collect(),
        )
    }

    // ---- blocking starts ----------------------------------------------

    /// Run every pending pool in registration order.
    pub fn start(&self) -> Result<RunOutcome, SchedulerError> {
        let names = self.pending_pools();
        self.start_pools(&names)
    }

    /// Run one pool and block until it finishes.
    pub fn start_pool(&self, name: &str) -> Result<RunOutcome, SchedulerError> {
        self.start_pools(&[name])
    }

    /// Run the named pools one after another, in the order given.
    ///
    /// Every pool is marked running before the first one starts, so a pool
    /// already running anywhere in the request rejects the whole call.
    pub fn start_pools<S: AsRef<str>>(&self, names: &[S]) -> Result<RunOutcome, SchedulerError> {
        let names = self.resolve(names)?;
        self.check_invariants()?;
        let mut registration = Registration::acquire(&self.running, &names)?;

        let multi = names.len() > 1;
        let mut watch = Stopwatch::started();
        if multi {
            self.ctx.messenger.all_pools_start(names.len());
        }

        for (idx, name) in names.iter().enumerate() {
            let pool = self.pool_ref(name)?;
            let status = run_pool(pool, &self.ctx);
            self.mark_done(name);
            registration.finish(name);

            if status != Status::Success
                && !self.ctx.config.start_next_pool_on_failure
                && idx + 1 < names.len()
            {
                self.ctx.messenger.pool_stop_next(name);
                break;
            }
        }
        drop(registration);

        watch.stop();
        if multi {
            self.ctx.messenger.all_pools_finished(&watch);
        }
        self.outcome(&names)
    }

    // ---- async starts --------------------------------------------------

    /// Start every pending pool concurrently without waiting.
    pub fn start_async(&self) -> Result<(), SchedulerError> {
        let names = self.pending_pools();
        self.start_pools_async(&names)
    }

    /// Start the named pools concurrently without waiting.
    ///
    /// Each pool runs on its own controller thread; no ordering or failure
    /// propagation applies between them.
    pub fn start_pools_async<S: AsRef<str>>(&self, names: &[S]) -> Result<(), SchedulerError> {
        let names = self.resolve(names)?;
        self.check_invariants()?;
        let registration = Registration::acquire(&self.running, &names)?;

        if names.len() > 1 {
            self.ctx.messenger.all_pools_start(names.len());
        }

        for single in registration.split() {
            let Some((name, _)) = single.runs.first() else {
                continue;
            };
            let name = name.clone();
            let pool = self.pool_ref(&name)?.clone();
            let ctx = self.ctx.clone();

            thread::Builder::new()
                .name(name.clone())
                .spawn(move || {
                    let mut single = single;
                    run_pool(&pool, &ctx);
                    single.finish(pool.name());
                })
                .map_err(|source| SchedulerError::Spawn {
                    name: name.clone(),
                    source,
                })?;
            self.mark_done(&name);
        }
        Ok(())
    }

    /// Start every pending pool concurrently and wait for all of them.
    pub fn start_async_and_join(
        &self,
        timeout: Option<Duration>,
    ) -> Result<RunOutcome, SchedulerError> {
        let names = self.pending_pools();
        self.start_pools_async_and_join(&names, timeout)
    }

    /// Start the named pools concurrently and wait for all of them.
    pub fn start_pools_async_and_join<S: AsRef<str>>(
        &self,
        names: &[S],
        timeout: Option<Duration>,
    ) -> Result<RunOutcome, SchedulerError> {
        let mut watch = Stopwatch::started();
        self.start_pools_async(names)?;
        self.join_pools(names, timeout)?;
        watch.stop();
        if names.len() > 1 {
            self.ctx.messenger.all_pools_finished(&watch);
        }
        self.outcome(names)
    }

    // ---- joins ---------------------------------------------------------

    /// Wait for an async run of `pool`. `None` waits without limit.
    ///
    /// A pool that is not running returns its status immediately. Timing out
    /// leaves the run untouched.
    pub fn join_pool(&self, pool: &str, timeout: Option<Duration>) -> Result<Status, SchedulerError> {
        self.join_pools(&[pool], timeout)
    }

    /// Wait for several pools under one total budget, consumed pool by pool.
    pub fn join_pools<S: AsRef<str>>(
        &self,
        pools: &[S],
        timeout: Option<Duration>,
    ) -> Result<Status, SchedulerError> {
        let runs = self.runs_for(pools)?;
        wait_for_runs(&runs, timeout, self.ctx.config.poll_interval())?;
        self.status_of(pools)
    }

    /// Async form of [`Scheduler::join_pools`]; waits on tokio's blocking pool.
    pub async fn join_pools_async<S: AsRef<str>>(
        &self,
        pools: &[S],
        timeout: Option<Duration>,
    ) -> Result<Status, SchedulerError> {
        let runs = self.runs_for(pools)?;
        let poll = self.ctx.config.poll_interval();
        tokio::task::spawn_blocking(move || wait_for_runs(&runs, timeout, poll))
            .await
            .map_err(|e| SchedulerError::Interrupted(e.to_string()))??;
        self.status_of(pools)
    }

    fn runs_for<S: AsRef<str>>(
        &self,
        pools: &[S],
    ) -> Result<Vec<(String, Option<Arc<PoolRun>>)>, SchedulerError> {
        let names = self.resolve(pools)?;
        let running = self.running.lock();
        Ok(names
            .into_iter()
            .map(|name| {
                let run = running.get(&name).cloned();
                (name, run)
            })
            .collect())
    }

    // ---- internals -----------------------------------------------------

    fn check_invariants(&self) -> Result<(), SchedulerError> {
        let pools: Vec<&Pool> = self.ordered_pools().collect();
        validate(pools.iter().copied(), self.ctx.config.cycle_check)
    }

    fn mark_done(&self, name: &str) {
        self.pending.lock().retain(|p| p != name);
    }

    fn outcome<S: AsRef<str>>(&self, names: &[S]) -> Result<RunOutcome, SchedulerError> {
        let status = self.status_of(names)?;
        let failed_pools = self.failed_pools(names);
        let terminal_failure = self.ctx.config.exit_on_error && status == Status::Failed;
        if terminal_failure {
            self.ctx.messenger.pool_exit_on_error(&failed_pools);
        }
        Ok(RunOutcome {
            status,
            failed_pools,
            terminal_failure,
        })
    }
}

fn wait_for_runs(
    runs: &[(String, Option<Arc<PoolRun>>)],
    timeout: Option<Duration>,
    poll: Duration,
) -> Result<(), SchedulerError> {
    let deadline = timeout.map(|t| Instant::now() + t);
    for (name, run) in runs {
        let Some(run) = run else { continue };
        match run.wait_until(deadline, poll) {
            RunState::Done => {}
            RunState::Interrupted => return Err(SchedulerError::Interrupted(name.clone())),
            RunState::Running => return Err(SchedulerError::JoinTimeout { pool: name.clone() }),
        }
    }
    Ok(())
}
