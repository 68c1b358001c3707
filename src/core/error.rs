//! Error types for scheduler operations.

use std::io;

use thiserror::Error;

/// Errors produced by scheduler components.
///
/// Task failures never appear here; they are recorded as a unit status.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Two or more work units share a name.
    #[error("worker names must be unique across all pools; duplicated: {}", .0.join(", "))]
    DuplicateNames(Vec<String>),
    /// Open dependencies form a cycle. The path starts and ends with the same unit.
    #[error("circular dependency: {}", .0.join(" -> "))]
    CircularDependency(Vec<String>),
    /// The pool is already being run by another start call.
    #[error("pool already running: {0}")]
    AlreadyRunning(String),
    /// No pool with this name is registered.
    #[error("unknown pool: {0}")]
    UnknownPool(String),
    /// No work unit with this name is registered.
    #[error("unknown worker: {0}")]
    UnknownWorker(String),
    /// A pool with this name is already registered.
    #[error("duplicate pool: {0}")]
    DuplicatePool(String),
    /// The join budget ran out before the pool finished.
    #[error("timed out waiting for pool {pool}")]
    JoinTimeout {
        /// Pool still running when the budget ran out.
        pool: String,
    },
    /// The thread controlling a pool run died before reporting completion.
    #[error("pool run interrupted: {0}")]
    Interrupted(String),
    /// The OS refused to start a thread.
    #[error("failed to spawn thread for {name}")]
    Spawn {
        /// Unit or pool the thread was for.
        name: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// Scheduler configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
