use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use super::super::AppState;
use super::require;
use crate::core::error::EngineError;
use crate::core::models::{Schedule, ScheduleUpdate};

#[derive(Deserialize)]
pub struct CreateScheduleRequest {
    name: Option<String>,
    scenario_type: Option<String>,
    cron_expr: Option<String>,
    #[serde(default)]
    enabled: bool,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
}

pub async fn create_schedule(
    State(state): State<AppState>,
    Json(request): Json<CreateScheduleRequest>,
) -> Result<Json<Value>, EngineError> {
    let schedule = Schedule {
        id: String::new(),
        name: require(request.name, "name")?,
        scenario_type: require(request.scenario_type, "scenario_type")?,
        cron_expr: require(request.cron_expr, "cron_expr")?,
        enabled: request.enabled,
        start_date: request.start_date,
        end_date: request.end_date,
        last_run: None,
        next_run: None,
        created_at: Utc::now(),
    };

    let created = state.manager.create_schedule(schedule).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "schedule created",
        "schedule": created,
    })))
}

pub async fn list_schedules(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "success",
        "schedules": state.manager.schedules().await,
    }))
}

pub async fn get_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, EngineError> {
    let schedule = state
        .manager
        .schedule(&id)
        .await
        .ok_or_else(|| EngineError::NotFound("schedule", id))?;
    Ok(Json(json!({
        "status": "success",
        "schedule": schedule,
    })))
}

pub async fn update_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(updates): Json<ScheduleUpdate>,
) -> Result<Json<Value>, EngineError> {
    let updated = state.manager.update_schedule(&id, updates).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "schedule updated",
        "schedule": updated,
    })))
}

pub async fn delete_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, EngineError> {
    state.manager.delete_schedule(&id).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "schedule deleted",
    })))
}

pub async fn enable_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, EngineError> {
    let schedule = state.manager.enable_schedule(&id).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "schedule enabled",
        "schedule": schedule,
    })))
}

pub async fn disable_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, EngineError> {
    let schedule = state.manager.disable_schedule(&id).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "schedule disabled",
        "schedule": schedule,
    })))
}

#[derive(Deserialize)]
pub struct ExecutionsQuery {
    limit: Option<usize>,
}

pub async fn list_executions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ExecutionsQuery>,
) -> Result<Json<Value>, EngineError> {
    let limit = query.limit.filter(|l| *l > 0).unwrap_or(10);
    let executions = state.manager.schedule_executions(&id, limit).await?;
    Ok(Json(json!({
        "status": "success",
        "executions": executions,
    })))
}

/// The runtime accepts the 6-field form with a seconds prefix; these examples
/// use it directly.
pub async fn cron_examples() -> Json<Value> {
    let examples = [
        ("0 30 9 * * *", "Every day at 9:30:00"),
        ("0 0 2 * * *", "Every day at 2:00:00"),
        ("0 */5 * * * *", "Every 5 minutes"),
        ("0 0 9 * * 1", "Every Monday at 9:00:00"),
        ("0 0 6,18 * * *", "At 6:00:00 and 18:00:00 every day"),
        ("0 0 0 1 * *", "First day of every month at midnight"),
        ("0 0 12 * * *", "Every day at noon"),
        ("0 30 14 * * *", "Every day at 14:30:00"),
    ];

    Json(json!({
        "status": "success",
        "examples": examples
            .iter()
            .map(|(expression, description)| json!({
                "expression": expression,
                "description": description,
            }))
            .collect::<Vec<_>>(),
    }))
}
