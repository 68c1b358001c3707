//! Execution plumbing for admitted units and status reporting.

pub mod report;
pub mod unit_thread;

pub use report::{PoolReport, SchedulerReport, WorkerReport};
pub use unit_thread::{spawn_unit, UnitThread};
