//! Schedule engine rules: validation, arming, enable/disable laws, firing,
//! and activation-window handling.

use std::time::Duration;

use chrono::Utc;

use super::{eventually, manager_with_store};
use crate::core::error::EngineError;
use crate::core::models::{ExecutionStatus, Schedule, ScheduleUpdate};
use crate::core::storage::Storage;

fn schedule(name: &str, cron_expr: &str, enabled: bool) -> Schedule {
    Schedule {
        id: String::new(),
        name: name.to_string(),
        scenario_type: "load_test".to_string(),
        cron_expr: cron_expr.to_string(),
        enabled,
        start_date: None,
        end_date: None,
        last_run: None,
        next_run: None,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn create_rejects_invalid_cron_and_date_range() {
    let (manager, _store) = manager_with_store().await;

    let err = manager
        .create_schedule(schedule("bad", "not a cron", false))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidCron(_)));

    let mut reversed = schedule("reversed", "* * * * *", false);
    reversed.start_date = Some(Utc::now());
    reversed.end_date = Some(Utc::now() - chrono::Duration::hours(1));
    let err = manager.create_schedule(reversed).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidDateRange));

    manager.stop().await;
}

#[tokio::test]
async fn created_disabled_schedule_has_no_cron_entry() {
    let (manager, store) = manager_with_store().await;

    let created = manager
        .create_schedule(schedule("idle", "* * * * *", false))
        .await
        .unwrap();
    assert!(!created.id.is_empty());
    assert!(created.next_run.is_none());
    assert!(manager.state.read().await.cron_entries.is_empty());
    assert!(store.schedule(&created.id).await.unwrap().is_some());

    manager.stop().await;
}

#[tokio::test]
async fn enable_and_disable_follow_the_idempotence_laws() {
    let (manager, _store) = manager_with_store().await;

    let created = manager
        .create_schedule(schedule("toggle", "* * * * *", false))
        .await
        .unwrap();

    let enabled = manager.enable_schedule(&created.id).await.unwrap();
    assert!(enabled.enabled);
    assert!(enabled.next_run.is_some());
    assert!(enabled.next_run.unwrap() >= created.created_at);
    assert_eq!(manager.state.read().await.cron_entries.len(), 1);

    let err = manager.enable_schedule(&created.id).await.unwrap_err();
    assert!(matches!(err, EngineError::AlreadyEnabled));

    let disabled = manager.disable_schedule(&created.id).await.unwrap();
    assert!(!disabled.enabled);
    assert!(disabled.next_run.is_none());
    assert!(manager.state.read().await.cron_entries.is_empty());

    let err = manager.disable_schedule(&created.id).await.unwrap_err();
    assert!(matches!(err, EngineError::AlreadyDisabled));

    // Re-enable recomputes the next fire time.
    let enable_time = Utc::now();
    let reenabled = manager.enable_schedule(&created.id).await.unwrap();
    assert!(reenabled.next_run.unwrap() >= enable_time);

    manager.stop().await;
}

#[tokio::test]
async fn update_revalidates_cron_and_rearms() {
    let (manager, _store) = manager_with_store().await;

    let created = manager
        .create_schedule(schedule("editable", "* * * * *", true))
        .await
        .unwrap();
    let original_entry = *manager
        .state
        .read()
        .await
        .cron_entries
        .get(&created.id)
        .unwrap();

    let err = manager
        .update_schedule(
            &created.id,
            ScheduleUpdate {
                cron_expr: Some("garbage".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidCron(_)));
    assert_eq!(manager.schedule(&created.id).await.unwrap().cron_expr, "* * * * *");

    let updated = manager
        .update_schedule(
            &created.id,
            ScheduleUpdate {
                name: Some("renamed".to_string()),
                cron_expr: Some("0 0 12 * * *".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "renamed");
    assert_eq!(updated.cron_expr, "0 0 12 * * *");

    let state = manager.state.read().await;
    let new_entry = *state.cron_entries.get(&created.id).unwrap();
    assert_ne!(new_entry, original_entry, "cron entry should be replaced");
    drop(state);

    let parked = manager
        .update_schedule(
            &created.id,
            ScheduleUpdate {
                enabled: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(parked.next_run.is_none());
    assert!(manager.state.read().await.cron_entries.is_empty());

    manager.stop().await;
}

#[tokio::test]
async fn delete_removes_schedule_and_entry() {
    let (manager, store) = manager_with_store().await;

    let created = manager
        .create_schedule(schedule("short-lived", "* * * * *", true))
        .await
        .unwrap();
    manager.delete_schedule(&created.id).await.unwrap();

    assert!(manager.schedule(&created.id).await.is_none());
    assert!(store.schedule(&created.id).await.unwrap().is_none());
    assert!(manager.state.read().await.cron_entries.is_empty());

    let err = manager.delete_schedule(&created.id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_, _)));

    manager.stop().await;
}

#[tokio::test]
async fn firing_records_an_execution_and_advances_the_run_markers() {
    let (manager, _store) = manager_with_store().await;

    // 6-field form: fires every second.
    let created = manager
        .create_schedule(schedule("rapid", "* * * * * *", true))
        .await
        .unwrap();

    let fired = eventually(Duration::from_secs(5), || async {
        let executions = manager.schedule_executions(&created.id, 10).await.unwrap();
        executions
            .iter()
            .any(|e| e.status == ExecutionStatus::Completed)
    })
    .await;
    assert!(fired, "schedule should fire within a few seconds");

    let latest = manager.schedule(&created.id).await.unwrap();
    let last_run = latest.last_run.expect("last_run should be populated");
    let next_run = latest.next_run.expect("next_run should be populated");
    assert!(next_run > last_run);

    manager.stop().await;
}

#[tokio::test]
async fn firing_before_the_window_is_a_no_op() {
    let (manager, _store) = manager_with_store().await;

    let mut pending = schedule("not-yet", "* * * * * *", true);
    pending.start_date = Some(Utc::now() + chrono::Duration::hours(1));
    let created = manager.create_schedule(pending).await.unwrap();

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(manager
        .schedule_executions(&created.id, 10)
        .await
        .unwrap()
        .is_empty());
    let latest = manager.schedule(&created.id).await.unwrap();
    assert!(latest.enabled);
    assert!(latest.last_run.is_none());

    manager.stop().await;
}

#[tokio::test]
async fn schedule_past_its_end_date_is_auto_disabled() {
    let (manager, _store) = manager_with_store().await;

    // Already expired at creation: disabled while arming, nothing recorded.
    let mut expired = schedule("expired", "* * * * * *", true);
    expired.end_date = Some(Utc::now() - chrono::Duration::seconds(1));
    let created = manager.create_schedule(expired).await.unwrap();
    assert!(!created.enabled);
    assert!(created.next_run.is_none());
    assert!(manager.state.read().await.cron_entries.is_empty());
    assert!(manager
        .schedule_executions(&created.id, 10)
        .await
        .unwrap()
        .is_empty());

    // Expires while armed: the firing callback disables it.
    let mut closing = schedule("closing", "* * * * * *", true);
    closing.end_date = Some(Utc::now() + chrono::Duration::seconds(1));
    let created = manager.create_schedule(closing).await.unwrap();
    assert!(created.enabled);

    let disabled = eventually(Duration::from_secs(6), || async {
        let latest = manager.schedule(&created.id).await.unwrap();
        !latest.enabled && latest.next_run.is_none()
    })
    .await;
    assert!(disabled, "callback should auto-disable past the end date");
    assert!(!manager
        .state
        .read()
        .await
        .cron_entries
        .contains_key(&created.id));

    manager.stop().await;
}
