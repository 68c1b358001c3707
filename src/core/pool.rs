//! Named, ordered collection of work units with its own retry policy.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::status::Status;
use super::work_unit::WorkUnit;

/// Pool-level retry: how many extra rounds run when a round does not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolRetryPolicy {
    /// Additional rounds after the first.
    pub attempts: u32,
    /// Delay before each additional round.
    pub wait: Duration,
    /// Reset successful units too, not only unsuccessful ones.
    pub rerun_success: bool,
}

impl PoolRetryPolicy {
    /// Retry `attempts` rounds, sleeping `wait` before each.
    #[must_use]
    pub const fn new(attempts: u32, wait: Duration, rerun_success: bool) -> Self {
        Self {
            attempts,
            wait,
            rerun_success,
        }
    }
}

/// Outcome of evaluating whether a unit may be admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Every dependency succeeded.
    Ready,
    /// Some dependency is still open.
    Waiting,
    /// A dependency failed; the unit has been marked `PrecedenceFailed`.
    PrecedenceFailed,
}

/// A named group of work units.
#[derive(Debug, Clone)]
pub struct Pool {
    name: String,
    units: Vec<WorkUnit>,
    retry: PoolRetryPolicy,
    not_in_default: BTreeSet<String>,
}

impl Pool {
    /// Create an empty pool.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            units: Vec::new(),
            retry: PoolRetryPolicy::default(),
            not_in_default: BTreeSet::new(),
        }
    }

    /// Pool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Units in registration order.
    #[must_use]
    pub fn units(&self) -> &[WorkUnit] {
        &self.units
    }

    pub(crate) fn units_mut(&mut self) -> &mut Vec<WorkUnit> {
        &mut self.units
    }

    /// Number of units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the pool has no units.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Append a unit. Returns its index.
    pub fn push(&mut self, unit: WorkUnit) -> usize {
        self.units.push(unit);
        self.units.len() - 1
    }

    /// Look up a unit by exact name.
    #[must_use]
    pub fn unit(&self, name: &str) -> Option<&WorkUnit> {
        self.units.iter().find(|u| u.name() == name)
    }

    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.units.iter().position(|u| u.name() == name)
    }

    /// Pool retry policy.
    #[must_use]
    pub const fn retry(&self) -> PoolRetryPolicy {
        self.retry
    }

    /// Replace the pool retry policy.
    pub const fn set_retry(&mut self, retry: PoolRetryPolicy) {
        self.retry = retry;
    }

    /// Exclude a unit from runs selected with `ALL`.
    pub fn mark_not_in_default(&mut self, name: impl Into<String>) {
        self.not_in_default.insert(name.into());
    }

    /// Whether the unit is excluded from runs selected with `ALL`.
    #[must_use]
    pub fn is_not_in_default(&self, name: &str) -> bool {
        self.not_in_default.contains(name)
    }

    /// Names flagged as not part of the default run.
    #[must_use]
    pub const fn not_in_default(&self) -> &BTreeSet<String> {
        &self.not_in_default
    }

    pub(crate) fn rename_not_in_default(&mut self, old: &str, new: &str) {
        if self.not_in_default.remove(old) {
            self.not_in_default.insert(new.to_string());
        }
    }

    /// Drop every unit for which `keep` returns false. Returns the removed names.
    pub fn retain_units<F>(&mut self, mut keep: F) -> Vec<String>
    where
        F: FnMut(&WorkUnit) -> bool,
    {
        let mut removed = Vec::new();
        self.units.retain(|unit| {
            let retain = keep(unit);
            if !retain {
                removed.push(unit.name().to_string());
            }
            retain
        });
        for name in &removed {
            self.not_in_default.remove(name);
        }
        removed
    }

    /// Composite status: the lowest-severity unit status, or `Empty`.
    #[must_use]
    pub fn status(&self) -> Status {
        Status::aggregate(self.units.iter().map(WorkUnit::status))
    }

    /// Decide whether `unit` can run now.
    ///
    /// Dependencies are matched by exact name within this pool; names with
    /// no match are ignored. A failed dependency closes the unit as
    /// `PrecedenceFailed` regardless of the state of its other dependencies.
    pub fn evaluate_readiness(&self, unit: &WorkUnit) -> Readiness {
        if unit.status() == Status::PrecedenceFailed {
            return Readiness::PrecedenceFailed;
        }
        let mut waiting = false;
        for dependency in unit.dependencies() {
            let Some(target) = self.unit(dependency) else {
                continue;
            };
            let status = target.status();
            if status.is_failed() {
                unit.transition(Status::Pending, Status::PrecedenceFailed);
                return Readiness::PrecedenceFailed;
            }
            if status != Status::Success {
                waiting = true;
            }
        }
        if waiting {
            Readiness::Waiting
        } else {
            Readiness::Ready
        }
    }

    /// Dependencies of `unit` that are present in this pool and still open.
    #[must_use]
    pub fn open_dependencies<'a>(&'a self, unit: &'a WorkUnit) -> Vec<&'a str> {
        unit.dependencies()
            .iter()
            .filter(|dep| self.unit(dep).is_some_and(|t| t.status().is_open()))
            .map(String::as_str)
            .collect()
    }

    /// One-line summary of each unit and what it still waits on.
    #[must_use]
    pub fn detail(&self) -> String {
        self.units
            .iter()
            .map(|unit| {
                let open = self.open_dependencies(unit);
                if open.is_empty() {
                    format!("{} [{}]", unit.name(), unit.status())
                } else {
                    format!(
                        "{} [{}, waiting on {}]",
                        unit.name(),
                        unit.status(),
                        open.join(", ")
                    )
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Reset units to `Pending` before another round.
    ///
    /// Successful units are reset only when `rerun_success` is set.
    pub fn reset_for_retry(&self) {
        for unit in &self.units {
            if self.retry.rerun_success || unit.status() != Status::Success {
                unit.set_status(Status::Pending);
            }
        }
    }
}
