//! Task bodies executed by work units.

use std::future::Future;

use async_trait::async_trait;

use super::AppResult;

/// Caller-supplied logic for a work unit.
///
/// `execute` runs on a dedicated OS thread with its own single-threaded tokio
/// runtime, so it may block or await freely. Returning `Err` (or panicking)
/// counts as a failed attempt; the unit's retry policy decides what happens
/// next.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_workpool::core::{AppResult, Task};
///
/// struct LoadCustomers {
///     table: String,
/// }
///
/// #[async_trait]
/// impl Task for LoadCustomers {
///     async fn execute(&self) -> AppResult<()> {
///         load_table(&self.table).await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Perform the work. Errors are recorded in the unit's status.
    async fn execute(&self) -> AppResult<()>;
}

/// A [`Task`] built from an async closure. See [`task_fn`].
pub struct FnTask<F>(F);

/// A [`Task`] built from a blocking closure. See [`blocking_fn`].
pub struct BlockingTask<F>(F);

/// Wrap an async closure as a task.
pub const fn task_fn<F, Fut>(f: F) -> FnTask<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    FnTask(f)
}

/// Wrap a blocking closure as a task.
pub const fn blocking_fn<F>(f: F) -> BlockingTask<F>
where
    F: Fn() -> AppResult<()> + Send + Sync + 'static,
{
    BlockingTask(f)
}

#[async_trait]
impl<F, Fut> Task for FnTask<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    async fn execute(&self) -> AppResult<()> {
        (self.0)().await
    }
}

#[async_trait]
impl<F> Task for BlockingTask<F>
where
    F: Fn() -> AppResult<()> + Send + Sync + 'static,
{
    async fn execute(&self) -> AppResult<()> {
        (self.0)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_task_fn_runs_closure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let task = task_fn(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        task.execute().await.unwrap();
        task.execute().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_blocking_fn_propagates_error() {
        let task = blocking_fn(|| anyhow::bail!("disk full"));
        let err = task.execute().await.unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }
}
