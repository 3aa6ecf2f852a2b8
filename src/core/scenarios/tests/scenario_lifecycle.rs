//! Worker lifecycles: one-shot completion, stop semantics, and the
//! soft-replace behavior of starting an already-active kind.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::{Value, json};

use super::{eventually, manager_with_store};
use crate::core::error::EngineError;
use crate::core::storage::Storage;

fn tiny(count: u64) -> HashMap<String, Value> {
    HashMap::from([("log_count".to_string(), json!(count))])
}

#[tokio::test]
async fn starting_an_unknown_scenario_fails() {
    let (manager, _store) = manager_with_store().await;
    let err = manager.start_scenario("bogus", None).await.unwrap_err();
    assert!(matches!(err, EngineError::UnknownScenario(_)));
    manager.stop().await;
}

#[tokio::test]
async fn one_shot_scenario_runs_and_clears_the_registry() {
    let (manager, store) = manager_with_store().await;

    manager
        .start_scenario("load_test", Some(&tiny(1)))
        .await
        .unwrap();
    assert_eq!(manager.active_scenarios().await.len(), 1);

    let drained = eventually(Duration::from_secs(5), || async {
        manager.active_scenarios().await.is_empty()
    })
    .await;
    assert!(drained, "one-shot worker should deregister itself");
    assert!(store.active_scenarios().await.unwrap().is_empty());

    manager.stop().await;
}

#[tokio::test]
async fn stop_deactivates_and_second_stop_reports_not_active() {
    let (manager, _store) = manager_with_store().await;

    let config = HashMap::from([
        ("log_count".to_string(), json!(1)),
        ("interval_seconds".to_string(), json!(1)),
    ]);
    manager
        .start_scenario("continuous_load", Some(&config))
        .await
        .unwrap();

    manager.stop_scenario("continuous_load").await.unwrap();
    let err = manager.stop_scenario("continuous_load").await.unwrap_err();
    assert!(matches!(err, EngineError::NotActive(_)));

    let drained = eventually(Duration::from_secs(5), || async {
        manager.active_scenarios().await.is_empty()
    })
    .await;
    assert!(drained, "periodic worker should observe deactivation");

    let err = manager.stop_scenario("continuous_load").await.unwrap_err();
    assert!(matches!(err, EngineError::NotActive(_)));

    manager.stop().await;
}

#[tokio::test]
async fn restarting_an_active_kind_replaces_the_registration() {
    let (manager, store) = manager_with_store().await;

    let slow = HashMap::from([
        ("log_count".to_string(), json!(1)),
        ("interval_seconds".to_string(), json!(1)),
    ]);
    manager
        .start_scenario("continuous_load", Some(&slow))
        .await
        .unwrap();
    let first_launch = manager.active_scenarios().await[0].launch_id;

    let replacement = HashMap::from([
        ("log_count".to_string(), json!(7)),
        ("interval_seconds".to_string(), json!(60)),
    ]);
    manager
        .start_scenario("continuous_load", Some(&replacement))
        .await
        .unwrap();

    let active = manager.active_scenarios().await;
    assert_eq!(active.len(), 1);
    assert_ne!(active[0].launch_id, first_launch);
    assert_eq!(active[0].config.log_count, 7);

    // The replaced worker ticks, notices it lost its slot, and exits without
    // clobbering the new registration in the registry or the store.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let active = manager.active_scenarios().await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].config.log_count, 7);
    let stored = store.active_scenarios().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].config.log_count, 7);

    manager.stop().await;
}

#[tokio::test]
async fn scenario_with_future_start_date_waits_before_generating() {
    let (manager, _store) = manager_with_store().await;

    let config = HashMap::from([
        ("log_count".to_string(), json!(1)),
        (
            "start_date".to_string(),
            json!((chrono::Utc::now() + chrono::Duration::hours(1)).to_rfc3339()),
        ),
    ]);
    manager
        .start_scenario("normal_operation", Some(&config))
        .await
        .unwrap();

    // The worker parks until the start date; the registration stays put.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(manager.active_scenarios().await.len(), 1);

    manager.stop().await;
}
