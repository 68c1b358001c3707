//! Tests for configuration loading and validation

use std::collections::HashMap;
use std::time::Duration;

use prometheus_workpool::config::{
    CycleCheck, Message, MessageLevel, MessageTemplates, SchedulerConfig,
};

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_scheduler_config_defaults() {
    let cfg = SchedulerConfig::default();
    assert_eq!(cfg.max_concurrent, 3);
    assert!(!cfg.stop_admission_on_failure);
    assert!(cfg.start_next_pool_on_failure);
    assert!(cfg.exit_on_error);
    assert_eq!(cfg.status_interval(), Duration::from_secs(600));
    assert_eq!(cfg.warn_interval(), Duration::from_secs(1200));
    assert_eq!(cfg.poll_interval(), Duration::from_secs(30));
    assert_eq!(cfg.cycle_check, CycleCheck::Full);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_scheduler_config_invalid_fields() {
    assert!(SchedulerConfig::new().with_max_concurrent(0).validate().is_err());
    assert!(SchedulerConfig::new()
        .with_poll_interval(Duration::ZERO)
        .validate()
        .is_err());
    assert!(SchedulerConfig::new()
        .with_status_interval(Duration::ZERO)
        .validate()
        .is_err());
    assert!(SchedulerConfig::new()
        .with_warn_interval(Duration::ZERO)
        .validate()
        .is_err());
}

#[test]
fn test_scheduler_config_from_json() {
    let cfg = SchedulerConfig::from_json_str(
        r#"{"max_concurrent": 8, "exit_on_error": false, "cycle_check": "reciprocal"}"#,
    )
    .unwrap();
    assert_eq!(cfg.max_concurrent, 8);
    assert!(!cfg.exit_on_error);
    assert_eq!(cfg.cycle_check, CycleCheck::Reciprocal);
    assert_eq!(cfg.poll_interval_ms, 30_000);

    assert!(SchedulerConfig::from_json_str(r#"{"max_concurrent": 0}"#).is_err());
    assert!(SchedulerConfig::from_json_str("not json").is_err());
}

#[test]
fn test_scheduler_config_from_lookup() {
    let cfg = SchedulerConfig::from_lookup(lookup(&[
        ("WORKPOOL_MAX_CONCURRENT", " 5 "),
        ("WORKPOOL_STOP_ADMISSION_ON_FAILURE", "yes"),
        ("WORKPOOL_START_NEXT_POOL_ON_FAILURE", "false"),
        ("WORKPOOL_POLL_INTERVAL_MS", "250"),
        ("WORKPOOL_CYCLE_CHECK", "Reciprocal"),
    ]))
    .unwrap();
    assert_eq!(cfg.max_concurrent, 5);
    assert!(cfg.stop_admission_on_failure);
    assert!(!cfg.start_next_pool_on_failure);
    assert_eq!(cfg.poll_interval(), Duration::from_millis(250));
    assert_eq!(cfg.cycle_check, CycleCheck::Reciprocal);
}

#[test]
fn test_scheduler_config_from_lookup_errors_name_the_variable() {
    let err = SchedulerConfig::from_lookup(lookup(&[("WORKPOOL_MAX_CONCURRENT", "many")]))
        .unwrap_err();
    assert!(err.contains("WORKPOOL_MAX_CONCURRENT"));

    let err = SchedulerConfig::from_lookup(lookup(&[("WORKPOOL_EXIT_ON_ERROR", "maybe")]))
        .unwrap_err();
    assert!(err.contains("WORKPOOL_EXIT_ON_ERROR"));

    assert!(SchedulerConfig::from_lookup(lookup(&[("WORKPOOL_MAX_CONCURRENT", "0")])).is_err());
}

#[test]
fn test_message_render() {
    let msg = Message::new("Pool {} finished with status {}", MessageLevel::Info);
    assert_eq!(msg.render(&[&"etl", &"SUCCESS"]), "Pool etl finished with status SUCCESS");
    assert_eq!(msg.render(&[&"etl"]), "Pool etl finished with status {}");
    assert_eq!(
        msg.render(&[&"etl", &"FAILED", &"extra"]),
        "Pool etl finished with status FAILED"
    );
}

#[test]
fn test_message_templates_override_from_json() {
    let templates = MessageTemplates::from_json_str(
        r#"{"worker_start": {"template": "go {}", "level": "debug"}}"#,
    )
    .unwrap();
    assert_eq!(templates.worker_start.template, "go {}");
    assert_eq!(templates.worker_start.level, MessageLevel::Debug);
    assert_eq!(templates.pool_start, MessageTemplates::default().pool_start);
}

#[test]
fn test_silent_templates_are_disabled() {
    let templates = MessageTemplates::silent();
    assert!(!templates.worker_start.is_enabled());
    assert!(!templates.pool_exit_on_error.is_enabled());
    assert!(MessageTemplates::default().worker_failed.is_enabled());
}
