//! Core scheduling: statuses, units, pools, admission, and orchestration.

pub mod admission;
pub mod error;
pub mod executor;
pub mod filter;
pub mod gate;
pub mod messenger;
pub mod pool;
pub mod scheduler;
pub mod signal;
pub mod status;
pub mod validate;
pub mod work_unit;

pub use admission::{run_pool, RunContext};
pub use error::{AppResult, SchedulerError};
pub use executor::{blocking_fn, task_fn, BlockingTask, FnTask, Task};
pub use filter::{RunFilter, ALL_TOKEN};
pub use gate::{ConcurrencyGate, GatePermit};
pub use messenger::{Messenger, RetryScope};
pub use pool::{Pool, PoolRetryPolicy, Readiness};
pub use scheduler::{RunOutcome, Scheduler};
pub use signal::{Signal, DEFAULT_POLL_INTERVAL};
pub use status::Status;
pub use work_unit::{RetryPolicy, WorkUnit};
