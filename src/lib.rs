//! # Prometheus Workpool
//!
//! Dependency-aware orchestration of named work units across named pools,
//! with a global concurrency cap, unit- and pool-level retries, and composite
//! status reporting.
//!
//! A caller registers pools and units on a [`core::Scheduler`], optionally
//! narrows the run with include/exclude tokens, then starts pools either
//! sequentially or concurrently. Each admitted unit runs on a dedicated OS
//! thread with its own single-threaded tokio runtime, so blocking and async
//! task bodies are both fine.
//!
//! ## Key Features
//!
//! - **Precedence constraints**: a unit starts only after every dependency in
//!   its pool succeeded; a failed dependency closes it as `PRECEDENCE_FAILED`
//! - **Bounded concurrency**: one gate shared by every pool of a scheduler
//! - **Retries**: per-unit attempts with a delay, plus whole-pool rounds
//! - **Composite status**: worst-severity aggregation over units and pools
//! - **Run filter**: `ALL`, `name`, `+name`, `-name` tokens, pool names expand
//! - **Terminal outcome**: failures are returned, never turned into process exits
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use prometheus_workpool::config::SchedulerConfig;
//! use prometheus_workpool::core::{blocking_fn, task_fn, Scheduler, WorkUnit};
//!
//! prometheus_workpool::util::init_tracing();
//!
//! let mut scheduler = Scheduler::new(SchedulerConfig::from_env()?)?;
//!
//! let mut nightly = scheduler.add_pool("nightly")?;
//! nightly.retry(1, Duration::from_secs(60), false);
//! nightly.add_worker(WorkUnit::new("extract", blocking_fn(|| extract())));
//! nightly
//!     .add_worker(WorkUnit::new("load", task_fn(|| async { load().await })))
//!     .depends_on("extract")
//!     .retry(2, Duration::from_secs(5));
//!
//! scheduler.apply_run_filter(std::env::args().skip(1));
//! let outcome = scheduler.start()?;
//! if let Some(code) = outcome.exit_code() {
//!     std::process::exit(code);
//! }
//! ```
//!
//! For complete scenarios, see `tests/scheduler_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling: statuses, units, pools, admission, and orchestration.
pub mod core;
/// Configuration models for scheduling behavior and log messages.
pub mod config;
/// Handles returned by add operations for fluent configuration.
pub mod builders;
/// Execution plumbing for admitted units and status reporting.
pub mod runtime;
/// Shared utilities.
pub mod util;

pub use crate::config::{CycleCheck, MessageLevel, MessageTemplates, SchedulerConfig};
pub use crate::core::{
    blocking_fn, task_fn, AppResult, Pool, RunFilter, RunOutcome, Scheduler, SchedulerError,
    Status, Task, WorkUnit,
};
