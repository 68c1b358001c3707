//! Explicit handles for configuring a registered pool or work unit.
//!
//! Every add operation returns a handle to what it added, so follow-up
//! configuration always targets a named item rather than "whatever was
//! added last".

use std::time::Duration;

use crate::core::pool::{Pool, PoolRetryPolicy};
use crate::core::status::Status;
use crate::core::work_unit::{RetryPolicy, WorkUnit};

/// Mutable access to one pool.
#[derive(Debug)]
pub struct PoolHandle<'a> {
    pool: &'a mut Pool,
}

impl<'a> PoolHandle<'a> {
    pub(crate) fn new(pool: &'a mut Pool) -> Self {
        Self { pool }
    }

    /// Pool name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.pool.name()
    }

    /// Current composite status.
    #[must_use]
    pub fn status(&self) -> Status {
        self.pool.status()
    }

    /// Set the pool retry policy.
    pub fn retry(&mut self, attempts: u32, wait: Duration, rerun_success: bool) -> &mut Self {
        self.pool
            .set_retry(PoolRetryPolicy::new(attempts, wait, rerun_success));
        self
    }

    /// Append a unit and return a handle to it.
    pub fn add_worker(&mut self, unit: WorkUnit) -> WorkerHandle<'_> {
        let index = self.pool.push(unit);
        WorkerHandle::new(self.pool, index)
    }

    /// Handle to an existing unit of this pool.
    pub fn worker(&mut self, name: &str) -> Option<WorkerHandle<'_>> {
        let index = self.pool.position(name)?;
        Some(WorkerHandle::new(self.pool, index))
    }

    /// Read-only view of the pool.
    #[must_use]
    pub fn pool(&self) -> &Pool {
        self.pool
    }

    /// Turn this handle into a handle on one of its units.
    #[must_use]
    pub fn into_worker(self, name: &str) -> Option<WorkerHandle<'a>> {
        let index = self.pool.position(name)?;
        Some(WorkerHandle::new(self.pool, index))
    }
}

/// Mutable access to one unit within its pool.
#[derive(Debug)]
pub struct WorkerHandle<'a> {
    pool: &'a mut Pool,
    index: usize,
}

impl<'a> WorkerHandle<'a> {
    pub(crate) fn new(pool: &'a mut Pool, index: usize) -> Self {
        Self { pool, index }
    }

    fn unit(&self) -> &WorkUnit {
        &self.pool.units()[self.index]
    }

    fn unit_mut(&mut self) -> &mut WorkUnit {
        &mut self.pool.units_mut()[self.index]
    }

    /// Unit name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.unit().name()
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> Status {
        self.unit().status()
    }

    /// Name of the owning pool.
    #[must_use]
    pub fn pool_name(&self) -> &str {
        self.pool.name()
    }

    /// Rename the unit. A "not in default run" flag follows the new name.
    pub fn rename(&mut self, name: impl Into<String>) -> &mut Self {
        let new = name.into();
        let old = self.name().to_string();
        self.pool.rename_not_in_default(&old, &new);
        self.unit_mut().set_name(new);
        self
    }

    /// Prepend `prefix` to the unit name.
    pub fn prefix_name(&mut self, prefix: &str) -> &mut Self {
        let name = format!("{prefix}{}", self.name());
        self.rename(name)
    }

    /// Append `suffix` to the unit name.
    pub fn suffix_name(&mut self, suffix: &str) -> &mut Self {
        let name = format!("{}{suffix}", self.name());
        self.rename(name)
    }

    /// Add a dependency on another unit in the same pool.
    pub fn depends_on(&mut self, name: impl Into<String>) -> &mut Self {
        self.unit_mut().add_dependency(name);
        self
    }

    /// Replace every dependency.
    pub fn set_dependencies<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unit_mut().set_dependencies(names);
        self
    }

    /// Remove every dependency.
    pub fn clear_dependencies(&mut self) -> &mut Self {
        self.unit_mut().clear_dependencies();
        self
    }

    /// Set the unit retry policy.
    pub fn retry(&mut self, attempts: u32, wait: Duration) -> &mut Self {
        self.unit_mut().set_retry(RetryPolicy::new(attempts, wait));
        self
    }

    /// Exclude the unit from runs selected with `ALL`.
    pub fn not_in_default_run(&mut self) -> &mut Self {
        let name = self.name().to_string();
        self.pool.mark_not_in_default(name);
        self
    }
}
