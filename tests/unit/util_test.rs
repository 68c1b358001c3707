//! Tests for utility functions

use std::thread;
use std::time::Duration;

use prometheus_workpool::util::{group_thousands, Stopwatch};

#[test]
fn test_group_thousands() {
    assert_eq!(group_thousands(0), "0");
    assert_eq!(group_thousands(999), "999");
    assert_eq!(group_thousands(1_000), "1,000");
    assert_eq!(group_thousands(1_234_567), "1,234,567");
}

#[test]
fn test_stopwatch_not_started() {
    let watch = Stopwatch::new();
    assert!(!watch.is_started());
    assert_eq!(watch.elapsed(), Duration::ZERO);
    assert_eq!(watch.to_string(), "stopwatch has not been started");
}

#[test]
fn test_stopwatch_stop_freezes_elapsed() {
    let mut watch = Stopwatch::started();
    thread::sleep(Duration::from_millis(5));
    watch.stop();
    let frozen = watch.elapsed();
    thread::sleep(Duration::from_millis(5));
    assert_eq!(watch.elapsed(), frozen);
    assert!(frozen >= Duration::from_millis(5));
}

#[test]
fn test_stopwatch_human_format() {
    let mut watch = Stopwatch::started();
    watch.stop();
    let text = watch.human();
    assert!(text.starts_with("00:00:00 ("), "{text}");
    assert!(text.ends_with(" milliseconds)"), "{text}");
}
