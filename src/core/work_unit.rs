//! A single named task with dependencies, a retry policy, and a status.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::util::Stopwatch;

use super::executor::Task;
use super::messenger::{Messenger, RetryScope};
use super::status::Status;

/// How many extra attempts a failing unit gets and how long it waits between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub attempts: u32,
    /// Delay before each additional attempt.
    pub wait: Duration,
}

impl RetryPolicy {
    /// No retries.
    pub const NONE: Self = Self {
        attempts: 0,
        wait: Duration::ZERO,
    };

    /// Retry `attempts` times, sleeping `wait` before each.
    #[must_use]
    pub const fn new(attempts: u32, wait: Duration) -> Self {
        Self { attempts, wait }
    }
}

/// Status slot shared by every clone of a unit.
#[derive(Debug)]
struct StatusCell(Mutex<Status>);

/// A named unit of work.
///
/// Clones share the same status slot and task body, so a unit handed to a
/// worker thread reports progress back to every other copy.
#[derive(Clone)]
pub struct WorkUnit {
    name: String,
    dependencies: BTreeSet<String>,
    retry: RetryPolicy,
    status: Arc<StatusCell>,
    task: Arc<dyn Task>,
}

impl fmt::Debug for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkUnit")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("retry", &self.retry)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl WorkUnit {
    /// Create a pending unit with no dependencies and no retries.
    pub fn new(name: impl Into<String>, task: impl Task) -> Self {
        Self::from_arc(name, Arc::new(task))
    }

    /// Create a unit from a shared task body.
    pub fn from_arc(name: impl Into<String>, task: Arc<dyn Task>) -> Self {
        Self {
            name: name.into(),
            dependencies: BTreeSet::new(),
            retry: RetryPolicy::NONE,
            status: Arc::new(StatusCell(Mutex::new(Status::Pending))),
            task,
        }
    }

    /// Add a dependency on another unit in the same pool.
    #[must_use]
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.insert(name.into());
        self
    }

    /// Add several dependencies.
    #[must_use]
    pub fn with_dependencies<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(names.into_iter().map(Into::into));
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, attempts: u32, wait: Duration) -> Self {
        self.retry = RetryPolicy::new(attempts, wait);
        self
    }

    /// Unit name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the unit.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> Status {
        *self.status.0.lock()
    }

    /// Overwrite the status.
    pub fn set_status(&self, status: Status) {
        *self.status.0.lock() = status;
    }

    /// Move to `to` only if the current status is `from`.
    pub fn transition(&self, from: Status, to: Status) -> bool {
        let mut current = self.status.0.lock();
        if *current == from {
            *current = to;
            true
        } else {
            false
        }
    }

    /// Names this unit waits on.
    #[must_use]
    pub const fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    /// Whether the unit has any dependencies.
    #[must_use]
    pub fn has_dependencies(&self) -> bool {
        !self.dependencies.is_empty()
    }

    /// Add a dependency.
    pub fn add_dependency(&mut self, name: impl Into<String>) {
        self.dependencies.insert(name.into());
    }

    /// Replace every dependency.
    pub fn set_dependencies<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = names.into_iter().map(Into::into).collect();
    }

    /// Remove every dependency.
    pub fn clear_dependencies(&mut self) {
        self.dependencies.clear();
    }

    /// Retry policy.
    #[must_use]
    pub const fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Replace the retry policy.
    pub const fn set_retry(&mut self, retry: RetryPolicy) {
        self.retry = retry;
    }

    /// Run the task body directly, without status handling.
    pub async fn execute(&self) -> super::AppResult<()> {
        self.task.execute().await
    }

    /// Run the unit with status tracking and retries.
    ///
    /// Does nothing unless the unit is `Pending`. Returns the final status.
    pub async fn run(&self) -> Status {
        self.run_observed(&Messenger::default()).await
    }

    pub(crate) async fn run_observed(&self, messenger: &Messenger) -> Status {
        if !self.transition(Status::Pending, Status::Running) {
            return self.status();
        }

        let mut watch = Stopwatch::started();
        messenger.worker_start(&self.name);

        let max = self.retry.attempts;
        let mut attempt = 0;
        let outcome = loop {
            match self.task.execute().await {
                Ok(()) => break Status::Success,
                Err(err) => {
                    let is_final = attempt >= max;
                    messenger.worker_error(&self.name, &err, is_final);
                    if is_final {
                        break Status::Failed;
                    }
                    attempt += 1;
                    messenger.retry(RetryScope::Worker, &self.name, max, attempt, self.retry.wait);
                    tokio::time::sleep(self.retry.wait).await;
                }
            }
        };

        self.set_status(outcome);
        watch.stop();
        messenger.worker_complete(&self.name, outcome, &watch);
        outcome
    }
}
