//! Tests for scheduler error messages

use std::error::Error as _;
use std::io;

use prometheus_workpool::core::SchedulerError;

#[test]
fn test_duplicate_names_lists_every_name() {
    let err = SchedulerError::DuplicateNames(vec!["load".into(), "report".into()]);
    assert_eq!(
        err.to_string(),
        "worker names must be unique across all pools; duplicated: load, report"
    );
}

#[test]
fn test_cycle_renders_path() {
    let err = SchedulerError::CircularDependency(vec!["a".into(), "b".into(), "a".into()]);
    assert_eq!(err.to_string(), "circular dependency: a -> b -> a");
}

#[test]
fn test_join_timeout_names_pool() {
    let err = SchedulerError::JoinTimeout {
        pool: "nightly".into(),
    };
    assert!(err.to_string().contains("nightly"));
}

#[test]
fn test_spawn_error_keeps_source() {
    let err = SchedulerError::Spawn {
        name: "extract".into(),
        source: io::Error::other("no threads left"),
    };
    assert!(err.to_string().contains("extract"));
    assert_eq!(err.source().unwrap().to_string(), "no threads left");
}

#[test]
fn test_converts_into_anyhow() {
    let err: anyhow::Error = SchedulerError::UnknownPool("ghost".into()).into();
    assert_eq!(err.to_string(), "unknown pool: ghost");
    assert!(err.downcast_ref::<SchedulerError>().is_some());
}
