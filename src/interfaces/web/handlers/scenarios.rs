use std::collections::HashMap;

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};

use super::super::AppState;
use super::require;
use crate::core::error::EngineError;

#[derive(Deserialize)]
pub struct StartScenarioRequest {
    #[serde(rename = "type")]
    kind: Option<String>,
    config: Option<HashMap<String, Value>>,
}

pub async fn start_scenario(
    State(state): State<AppState>,
    Json(request): Json<StartScenarioRequest>,
) -> Result<Json<Value>, EngineError> {
    let kind = require(request.kind, "type")?;
    state
        .manager
        .start_scenario(&kind, request.config.as_ref())
        .await?;

    Ok(Json(json!({
        "status": "success",
        "message": "scenario started",
        "type": kind,
    })))
}

#[derive(Deserialize)]
pub struct StopScenarioRequest {
    #[serde(rename = "type")]
    kind: Option<String>,
}

pub async fn stop_scenario(
    State(state): State<AppState>,
    Json(request): Json<StopScenarioRequest>,
) -> Result<Json<Value>, EngineError> {
    let kind = require(request.kind, "type")?;
    state.manager.stop_scenario(&kind).await?;

    Ok(Json(json!({
        "status": "success",
        "message": "scenario stopped",
        "type": kind,
    })))
}

pub async fn list_scenarios(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "available": state.manager.available_scenarios(),
        "active": state.manager.active_scenarios().await,
        "chains": state.manager.available_chains(),
    }))
}
