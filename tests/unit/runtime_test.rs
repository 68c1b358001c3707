//! Tests for status reports and the unit lifecycle

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use prometheus_workpool::core::{blocking_fn, Pool, Status, WorkUnit};
use prometheus_workpool::runtime::{PoolReport, SchedulerReport};

fn unit(name: &str) -> WorkUnit {
    WorkUnit::new(name, blocking_fn(|| Ok(())))
}

#[test]
fn test_pool_report_lists_open_dependencies() {
    let mut pool = Pool::new("p");
    pool.push(unit("a"));
    pool.push(unit("b").with_dependency("a"));

    let report = PoolReport::capture(&pool, false);

    assert_eq!(report.status, Status::Pending);
    assert!(report.workers[0].waiting_on.is_empty());
    assert_eq!(report.workers[1].waiting_on, ["a"]);
    assert_eq!(report.failed_workers().count(), 0);
}

#[test]
fn test_scheduler_report_json_shape() {
    let mut pool = Pool::new("etl");
    pool.push(unit("extract"));
    pool.unit("extract").unwrap().set_status(Status::Failed);

    let report = SchedulerReport::from_pools(vec![PoolReport::capture(&pool, false)]);
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

    assert_eq!(json["status"], "FAILED");
    assert_eq!(json["pools"][0]["name"], "etl");
    assert_eq!(json["pools"][0]["workers"][0]["status"], "FAILED");
    assert!(json["pools"][0]["workers"][0].get("waiting_on").is_none());
}

#[tokio::test]
async fn test_unit_run_retries_then_fails() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let unit = WorkUnit::new(
        "flaky",
        blocking_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("always")
        }),
    )
    .with_retry(2, Duration::from_millis(1));

    assert_eq!(unit.run().await, Status::Failed);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_unit_run_only_from_pending() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let unit = WorkUnit::new(
        "once",
        blocking_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }),
    );

    assert_eq!(unit.run().await, Status::Success);
    assert_eq!(unit.run().await, Status::Success);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let clone = unit.clone();
    clone.set_status(Status::Pending);
    assert_eq!(unit.status(), Status::Pending);
}
