//! Tests for pool and worker handles

use std::time::Duration;

use prometheus_workpool::config::SchedulerConfig;
use prometheus_workpool::core::{blocking_fn, Scheduler, Status, WorkUnit};

fn unit(name: &str) -> WorkUnit {
    WorkUnit::new(name, blocking_fn(|| Ok(())))
}

fn scheduler() -> Scheduler {
    Scheduler::new(SchedulerConfig::new()).unwrap()
}

#[test]
fn test_pool_handle_configures_named_pool() {
    let mut scheduler = scheduler();
    let mut pool = scheduler.add_pool("nightly").unwrap();
    assert_eq!(pool.name(), "nightly");
    assert_eq!(pool.status(), Status::Empty);

    pool.retry(2, Duration::from_secs(30), true);
    pool.add_worker(unit("a"));
    assert_eq!(pool.status(), Status::Pending);
    assert_eq!(pool.pool().len(), 1);

    let retry = scheduler.pool("nightly").unwrap().retry();
    assert_eq!(retry.attempts, 2);
    assert_eq!(retry.wait, Duration::from_secs(30));
    assert!(retry.rerun_success);
}

#[test]
fn test_worker_handle_targets_the_added_unit() {
    let mut scheduler = scheduler();
    let mut pool = scheduler.add_pool("p").unwrap();
    pool.add_worker(unit("first"));
    let mut second = pool.add_worker(unit("second"));
    second.depends_on("first").retry(3, Duration::from_millis(10));
    assert_eq!(second.pool_name(), "p");

    let first = scheduler.worker("first").unwrap();
    assert!(!first.has_dependencies());
    assert_eq!(first.retry().attempts, 0);

    let second = scheduler.worker("second").unwrap();
    assert!(second.dependencies().contains("first"));
    assert_eq!(second.retry().attempts, 3);
}

#[test]
fn test_worker_rename_carries_not_in_default_flag() {
    let mut scheduler = scheduler();
    scheduler.add_pool("p").unwrap();
    scheduler
        .add_worker("p", unit("audit"))
        .unwrap()
        .not_in_default_run()
        .prefix_name("pre_")
        .suffix_name("_v2");

    let pool = scheduler.pool("p").unwrap();
    assert!(pool.unit("pre_audit_v2").is_some());
    assert!(pool.is_not_in_default("pre_audit_v2"));
    assert!(!pool.is_not_in_default("audit"));
}

#[test]
fn test_worker_dependencies_replace_and_clear() {
    let mut scheduler = scheduler();
    scheduler.add_pool("p").unwrap();
    scheduler.add_worker("p", unit("x")).unwrap();
    scheduler.add_worker("p", unit("y")).unwrap();
    scheduler
        .add_worker("p", unit("z"))
        .unwrap()
        .depends_on("x")
        .set_dependencies(["y"]);
    assert_eq!(
        scheduler.worker("z").unwrap().dependencies().iter().collect::<Vec<_>>(),
        ["y"]
    );

    scheduler.worker_mut("z").unwrap().clear_dependencies();
    assert!(!scheduler.worker("z").unwrap().has_dependencies());
}

#[test]
fn test_pool_handle_lookup_of_existing_worker() {
    let mut scheduler = scheduler();
    scheduler.add_pool("p").unwrap();
    scheduler.add_worker("p", unit("a")).unwrap();

    let mut pool = scheduler.pool_mut("p").unwrap();
    assert!(pool.worker("missing").is_none());
    pool.worker("a").unwrap().rename("b");

    let handle = scheduler.pool_mut("p").unwrap().into_worker("b").unwrap();
    assert_eq!(handle.name(), "b");
    assert_eq!(handle.status(), Status::Pending);
}
