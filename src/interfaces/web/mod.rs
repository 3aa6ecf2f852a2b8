mod handlers;
mod router;

use std::sync::Arc;

use anyhow::Result;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, info};

use crate::core::error::EngineError;
use crate::core::generator::Generator;
use crate::core::scenarios::ScenarioManager;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) manager: Arc<ScenarioManager>,
    pub(crate) generator: Arc<Generator>,
}

pub struct ApiServer {
    manager: Arc<ScenarioManager>,
    generator: Arc<Generator>,
    port: u16,
}

impl ApiServer {
    pub fn new(manager: Arc<ScenarioManager>, generator: Arc<Generator>, port: u16) -> Self {
        Self {
            manager,
            generator,
            port,
        }
    }

    /// Serves the API until ctrl-c.
    pub async fn serve(self) -> Result<()> {
        let state = AppState {
            manager: self.manager,
            generator: self.generator,
        };
        let app = router::build_router(state);

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("API server running at http://{addr}");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}

/// Engine error kinds map onto the HTTP surface: validation errors are 400,
/// missing entities 404, faults 500. The body is always `{ "error": ... }`.
impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = match &self {
            EngineError::NotFound(_, _) => StatusCode::NOT_FOUND,
            EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("request failed: {self:#}");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
