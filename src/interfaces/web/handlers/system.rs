use axum::Json;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::super::AppState;

pub async fn health(State(_state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().timestamp(),
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "generator": true,
            "scenario_manager": true,
        },
    }))
}

#[derive(Deserialize)]
pub struct MetricsQuery {
    format: Option<String>,
}

/// Prometheus text exposition by default, the raw snapshot with
/// `?format=json`.
pub async fn metrics(
    State(state): State<AppState>,
    Query(query): Query<MetricsQuery>,
) -> Response {
    if query.format.as_deref() == Some("json") {
        let metrics = state.generator.metrics().await;
        return Json(json!({
            "metrics": metrics,
            "count": metrics.len(),
        }))
        .into_response();
    }

    let text = state.generator.prometheus_text().await;
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        text,
    )
        .into_response()
}
