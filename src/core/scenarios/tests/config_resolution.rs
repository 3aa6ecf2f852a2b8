//! Resolution of scenario kinds and custom config merging.

use std::collections::HashMap;

use serde_json::{Value, json};

use crate::core::catalog;
use crate::core::error::EngineError;
use crate::core::scenarios::{duration_from_config, normalize_cron, resolve_scenario, validate_cron};

fn custom(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn unknown_kind_is_rejected() {
    let err = resolve_scenario("no_such_scenario", None).unwrap_err();
    assert!(matches!(err, EngineError::UnknownScenario(_)));
}

#[test]
fn defaults_are_taken_from_the_catalogue() {
    let scenario = resolve_scenario("load_test", None).unwrap();
    assert!(scenario.active);
    assert_eq!(scenario.config.log_count, 1000);
    assert_eq!(scenario.config.name, "Load Test");
    assert!(scenario.duration_secs.is_none());
    assert!(scenario.interval_secs.is_none());
}

#[test]
fn log_count_and_labels_override_defaults() {
    let cfg = custom(&[
        ("log_count", json!(25)),
        ("labels", json!({"region": "eu-west", "environment": "staging"})),
    ]);
    let scenario = resolve_scenario("load_test", Some(&cfg)).unwrap();
    assert_eq!(scenario.config.log_count, 25);
    assert_eq!(scenario.config.labels["region"], "eu-west");
    // merged over defaults, not replacing them
    assert_eq!(scenario.config.labels["test_type"], "load");
    assert_eq!(scenario.config.labels["environment"], "staging");
}

#[test]
fn label_overrides_do_not_leak_into_the_catalogue() {
    let cfg = custom(&[("labels", json!({"test_type": "mutated"}))]);
    resolve_scenario("load_test", Some(&cfg)).unwrap();
    assert_eq!(
        catalog::predefined_scenarios()["load_test"].labels["test_type"],
        "load"
    );
}

#[test]
fn duration_units_last_parsed_wins() {
    let cfg = custom(&[("duration_minutes", json!(2))]);
    assert_eq!(
        resolve_scenario("load_test", Some(&cfg)).unwrap().duration_secs,
        Some(120)
    );

    let cfg = custom(&[("duration_minutes", json!(2)), ("duration_seconds", json!(30))]);
    assert_eq!(
        resolve_scenario("load_test", Some(&cfg)).unwrap().duration_secs,
        Some(30)
    );

    let cfg = custom(&[("interval_seconds", json!(30)), ("interval_minutes", json!(1))]);
    assert_eq!(
        resolve_scenario("load_test", Some(&cfg)).unwrap().interval_secs,
        Some(60)
    );
}

#[test]
fn dates_parse_rfc3339_and_ignore_garbage() {
    let cfg = custom(&[
        ("start_date", json!("2031-01-01T00:00:00Z")),
        ("end_date", json!("not a date")),
    ]);
    let scenario = resolve_scenario("load_test", Some(&cfg)).unwrap();
    assert!(scenario.start_date.is_some());
    assert!(scenario.end_date.is_none());
}

#[test]
fn step_duration_hint_prefers_seconds() {
    let cfg = custom(&[
        ("duration_seconds", json!(3)),
        ("duration_minutes", json!(10)),
    ]);
    assert_eq!(
        duration_from_config(Some(&cfg)),
        Some(std::time::Duration::from_secs(3))
    );

    let cfg = custom(&[("duration_hours", json!(1))]);
    assert_eq!(
        duration_from_config(Some(&cfg)),
        Some(std::time::Duration::from_secs(3600))
    );

    assert_eq!(duration_from_config(None), None);
    assert_eq!(duration_from_config(Some(&custom(&[]))), None);
}

#[test]
fn five_field_cron_gains_a_seconds_prefix() {
    assert_eq!(normalize_cron("* * * * *").as_deref(), Some("0 * * * * *"));
    assert_eq!(
        normalize_cron("*/5  9-17 * * 1-5").as_deref(),
        Some("0 */5 9-17 * * 1-5")
    );
    assert_eq!(
        normalize_cron("0 30 9 * * *").as_deref(),
        Some("0 30 9 * * *")
    );
    assert!(normalize_cron("* * *").is_none());
    assert!(normalize_cron("").is_none());
}

#[test]
fn cron_validation_rejects_nonsense() {
    assert!(validate_cron("* * * * *").is_ok());
    assert!(validate_cron("0 */5 * * * *").is_ok());
    assert!(matches!(
        validate_cron("not a cron"),
        Err(EngineError::InvalidCron(_))
    ));
    assert!(matches!(
        validate_cron("99 99 99 99 99"),
        Err(EngineError::InvalidCron(_))
    ));
}
