//! Renders configured message templates and emits them through `tracing`.

use std::fmt::Display;
use std::time::Duration;

use tracing::{debug, error, info, trace, warn};

use crate::config::{Message, MessageLevel, MessageTemplates};
use crate::util::Stopwatch;

use super::status::Status;

/// Whether a retry message is for a single unit or a whole pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryScope {
    /// Unit-level retry.
    Worker,
    /// Pool-level retry.
    Pool,
}

impl Display for RetryScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Worker => "Worker",
            Self::Pool => "Pool",
        })
    }
}

/// Logging collaborator invoked at each scheduler extension point.
#[derive(Debug, Clone, Default)]
pub struct Messenger {
    templates: MessageTemplates,
}

impl Messenger {
    /// Create a messenger over the given templates.
    #[must_use]
    pub const fn new(templates: MessageTemplates) -> Self {
        Self { templates }
    }

    /// Configured templates.
    #[must_use]
    pub const fn templates(&self) -> &MessageTemplates {
        &self.templates
    }

    /// Multi-pool run is starting.
    pub fn all_pools_start(&self, count: usize) {
        emit(&self.templates.all_pools_start, &[&count]);
    }

    /// Multi-pool run finished.
    pub fn all_pools_finished(&self, elapsed: &Stopwatch) {
        emit(&self.templates.all_pools_finished, &[&elapsed.human()]);
    }

    /// Pool round is starting. `detail` lists workers and what they wait on.
    pub fn pool_start(&self, pool: &str, detail: &str) {
        emit(&self.templates.pool_start, &[&pool, &detail]);
    }

    /// Pool has no workers.
    pub fn pool_empty(&self, pool: &str) {
        emit(&self.templates.pool_empty, &[&pool]);
    }

    /// Pool run finished.
    pub fn pool_complete(&self, pool: &str, status: Status, elapsed: &Stopwatch, detail: &str) {
        emit(
            &self.templates.pool_complete,
            &[&pool, &status, &elapsed.human(), &detail],
        );
    }

    /// Pool is still joining its workers.
    pub fn pool_heartbeat(&self, pool: &str, elapsed: &Stopwatch, detail: &str, long_running: bool) {
        let message = if long_running {
            &self.templates.pool_long_running
        } else {
            &self.templates.pool_heartbeat
        };
        emit(message, &[&pool, &elapsed.human(), &detail]);
    }

    /// Admission halted because a unit failed.
    pub fn pool_stop_admission(&self, pool: &str) {
        emit(&self.templates.pool_stop_admission, &[&pool]);
    }

    /// Remaining pools skipped because this one did not succeed.
    pub fn pool_stop_next(&self, pool: &str) {
        emit(&self.templates.pool_stop_next, &[&pool]);
    }

    /// Run ended in terminal failure.
    pub fn pool_exit_on_error(&self, pools: &[String]) {
        emit(&self.templates.pool_exit_on_error, &[&pools.join(", ")]);
    }

    /// Unit began executing.
    pub fn worker_start(&self, name: &str) {
        emit(&self.templates.worker_start, &[&name]);
    }

    /// Unit reached a terminal status.
    pub fn worker_complete(&self, name: &str, status: Status, elapsed: &Stopwatch) {
        emit(
            &self.templates.worker_complete,
            &[&name, &status, &elapsed.human()],
        );
    }

    /// Unit attempt failed; `is_final` when no attempts remain.
    pub fn worker_error(&self, name: &str, error: &dyn Display, is_final: bool) {
        let message = if is_final {
            &self.templates.worker_failed
        } else {
            &self.templates.worker_error
        };
        emit(message, &[&name, &error]);
    }

    /// A unit or pool is about to be retried.
    pub fn retry(&self, scope: RetryScope, name: &str, max: u32, attempt: u32, wait: Duration) {
        emit(
            &self.templates.retry,
            &[&scope, &name, &max, &attempt, &wait.as_secs()],
        );
    }
}

fn emit(message: &Message, args: &[&dyn Display]) {
    if !message.is_enabled() {
        return;
    }
    let text = message.render(args);
    match message.level {
        MessageLevel::Trace => trace!("{text}"),
        MessageLevel::Debug => debug!("{text}"),
        MessageLevel::Info => info!("{text}"),
        MessageLevel::Warn => warn!("{text}"),
        MessageLevel::Error => error!("{text}"),
        MessageLevel::Off => {}
    }
}
