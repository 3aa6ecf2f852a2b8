use axum::Json;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use super::super::AppState;
use super::require;
use crate::core::error::EngineError;
use crate::core::models::{ChainSchedule, ChainScheduleUpdate};

#[derive(Deserialize)]
pub struct CreateChainScheduleRequest {
    name: Option<String>,
    chain_name: Option<String>,
    cron_expr: Option<String>,
    #[serde(default)]
    enabled: bool,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
}

pub async fn create_schedule(
    State(state): State<AppState>,
    Json(request): Json<CreateChainScheduleRequest>,
) -> Result<Json<Value>, EngineError> {
    let schedule = ChainSchedule {
        id: String::new(),
        name: require(request.name, "name")?,
        chain_name: require(request.chain_name, "chain_name")?,
        cron_expr: require(request.cron_expr, "cron_expr")?,
        enabled: request.enabled,
        start_date: request.start_date,
        end_date: request.end_date,
        last_run: None,
        next_run: None,
        created_at: Utc::now(),
    };

    let created = state.manager.create_chain_schedule(schedule).await?;
    Ok(Json(json!({
        "status": "success",
        "schedule": created,
    })))
}

pub async fn list_schedules(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "success",
        "schedules": state.manager.chain_schedules().await,
    }))
}

pub async fn get_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, EngineError> {
    let schedule = state
        .manager
        .chain_schedule(&id)
        .await
        .ok_or_else(|| EngineError::NotFound("chain schedule", id))?;
    Ok(Json(json!({
        "status": "success",
        "schedule": schedule,
    })))
}

pub async fn update_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(updates): Json<ChainScheduleUpdate>,
) -> Result<Json<Value>, EngineError> {
    let updated = state.manager.update_chain_schedule(&id, updates).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "chain schedule updated",
        "schedule": updated,
    })))
}

pub async fn delete_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, EngineError> {
    state.manager.delete_chain_schedule(&id).await?;
    Ok(Json(json!({ "status": "success" })))
}

pub async fn enable_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, EngineError> {
    state.manager.enable_chain_schedule(&id).await?;
    Ok(Json(json!({ "status": "success" })))
}

pub async fn disable_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, EngineError> {
    state.manager.disable_chain_schedule(&id).await?;
    Ok(Json(json!({ "status": "success" })))
}
