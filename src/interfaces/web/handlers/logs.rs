use axum::Json;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{Value, json};

use super::super::AppState;
use crate::core::error::EngineError;
use crate::core::generator::Generator;

#[derive(Deserialize)]
pub struct GenerateRequest {
    log_count: Option<i64>,
    scenario: Option<String>,
}

pub async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<Value>, EngineError> {
    let log_count = request
        .log_count
        .filter(|count| (1..=10_000).contains(count))
        .ok_or_else(|| {
            EngineError::InvalidRequest("log_count must be between 1 and 10000".to_string())
        })?;

    let scenario = request.scenario.unwrap_or_default();
    let batch = state.generator.generate(log_count as usize, &scenario).await;
    let metrics_count = state.generator.metrics().await.len();

    Ok(Json(json!({
        "status": "success",
        "generated": batch.len(),
        "sample_log": batch.first(),
        "metrics_count": metrics_count,
    })))
}

#[derive(Deserialize)]
pub struct LogsQuery {
    limit: Option<usize>,
    service: Option<String>,
    level: Option<String>,
    format: Option<String>,
}

pub async fn list_logs(State(state): State<AppState>, Query(query): Query<LogsQuery>) -> Response {
    let limit = query.limit.filter(|l| *l > 0).unwrap_or(100);
    let logs = state
        .generator
        .logs(limit, query.service.as_deref(), query.level.as_deref())
        .await;

    if query.format.as_deref() == Some("text") {
        let text = Generator::format_text(&logs);
        return ([(header::CONTENT_TYPE, "text/plain")], text).into_response();
    }

    Json(json!({
        "logs": logs,
        "count": logs.len(),
        "filters": {
            "service": query.service,
            "level": query.level,
            "limit": limit,
        },
    }))
    .into_response()
}

pub async fn log_statistics(State(state): State<AppState>) -> Json<Value> {
    let stats = state.generator.statistics().await;
    Json(json!({
        "status": "success",
        "stats": stats,
    }))
}
