//! Serializable status snapshots of pools and their units.

use serde::{Deserialize, Serialize};

use crate::core::pool::Pool;
use crate::core::status::Status;

/// Snapshot of a single unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReport {
    /// Unit name.
    pub name: String,
    /// Status at snapshot time.
    pub status: Status,
    /// Dependencies in the same pool that are still open.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub waiting_on: Vec<String>,
}

/// Snapshot of a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolReport {
    /// Pool name.
    pub name: String,
    /// Composite status.
    pub status: Status,
    /// Whether a start call is currently running this pool.
    pub running: bool,
    /// Units in registration order.
    pub workers: Vec<WorkerReport>,
}

impl PoolReport {
    /// Capture the current state of `pool`.
    #[must_use]
    pub fn capture(pool: &Pool, running: bool) -> Self {
        let workers = pool
            .units()
            .iter()
            .map(|unit| WorkerReport {
                name: unit.name().to_string(),
                status: unit.status(),
                waiting_on: pool
                    .open_dependencies(unit)
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            })
            .collect::<Vec<_>>();
        Self {
            name: pool.name().to_string(),
            status: Status::aggregate(workers.iter().map(|w| w.status)),
            running,
            workers,
        }
    }

    /// Reports of units whose status is failed.
    pub fn failed_workers(&self) -> impl Iterator<Item = &WorkerReport> {
        self.workers.iter().filter(|w| w.status.is_failed())
    }
}

/// Snapshot of every registered pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerReport {
    /// Composite status across all pools.
    pub status: Status,
    /// Pools in registration order.
    pub pools: Vec<PoolReport>,
}

impl SchedulerReport {
    /// Build a report from pool snapshots.
    #[must_use]
    pub fn from_pools(pools: Vec<PoolReport>) -> Self {
        Self {
            status: Status::aggregate(pools.iter().map(|p| p.status)),
            pools,
        }
    }

    /// Pretty JSON rendering.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::executor::blocking_fn;
    use crate::core::work_unit::WorkUnit;

    #[test]
    fn test_capture_lists_open_dependencies() {
        let mut pool = Pool::new("etl");
        pool.push(WorkUnit::new("extract", blocking_fn(|| Ok(()))));
        pool.push(WorkUnit::new("load", blocking_fn(|| Ok(()))).with_dependency("extract"));
        pool.units()[0].set_status(Status::Failed);

        let report = PoolReport::capture(&pool, false);
        assert_eq!(report.status, Status::Failed);
        assert!(report.workers[1].waiting_on.is_empty());
        assert_eq!(report.failed_workers().count(), 1);

        let json = SchedulerReport::from_pools(vec![report]).to_json().unwrap();
        assert!(json.contains("\"status\": \"FAILED\""), "{json}");
    }
}
