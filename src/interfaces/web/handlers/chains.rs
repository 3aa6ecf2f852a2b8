use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use super::super::AppState;
use super::require;
use crate::core::error::EngineError;
use crate::core::models::{ChainStatus, ChainStep, ScenarioChain};

#[derive(Deserialize)]
pub struct CreateChainRequest {
    name: Option<String>,
    #[serde(default)]
    description: String,
    steps: Option<Vec<ChainStep>>,
}

pub async fn create_chain(
    State(state): State<AppState>,
    Json(request): Json<CreateChainRequest>,
) -> Result<Json<Value>, EngineError> {
    let chain = ScenarioChain {
        id: String::new(),
        name: require(request.name, "name")?,
        description: request.description,
        steps: require(request.steps, "steps")?,
        status: ChainStatus::Pending,
        started_at: None,
        completed_at: None,
        created_at: Utc::now(),
    };

    let created = state.manager.create_chain(chain).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "chain created",
        "chain_id": created.id,
        "chain": created,
    })))
}

pub async fn list_chains(State(state): State<AppState>) -> Result<Json<Value>, EngineError> {
    let chains = state.manager.chains().await?;
    Ok(Json(json!({
        "status": "success",
        "chains": chains,
    })))
}

pub async fn get_chain(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, EngineError> {
    let chain = state
        .manager
        .chain(&id)
        .await?
        .ok_or_else(|| EngineError::NotFound("chain", id))?;
    Ok(Json(json!({
        "status": "success",
        "chain": chain,
    })))
}

pub async fn start_chain(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, EngineError> {
    let execution = state.manager.start_chain(&id).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "chain started",
        "chain_id": id,
        "execution_id": execution.id,
    })))
}

/// The path parameter is the execution id, not the chain id: stopping acts
/// on one run.
pub async fn stop_chain(
    State(state): State<AppState>,
    Path(execution_id): Path<String>,
) -> Result<Json<Value>, EngineError> {
    state.manager.stop_chain(&execution_id).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "chain stopped",
    })))
}

pub async fn delete_chain(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, EngineError> {
    state.manager.delete_chain(&id).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "chain deleted",
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
    let executions = state.manager.chain_executions(&id, limit).await?;
    Ok(Json(json!({
        "status": "success",
        "executions": executions,
    })))
}

pub async fn active_executions(State(state): State<AppState>) -> Json<Value> {
    let executions = state.manager.active_chain_executions().await;
    Json(json!({
        "status": "success",
        "count": executions.len(),
        "executions": executions,
    }))
}
