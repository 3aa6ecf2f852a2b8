use axum::{
    Router,
    http::Method,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};

use super::AppState;
use super::handlers::{chain_schedules, chains, logs, scenarios, schedules, system};

fn permissive_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // unprefixed, for Prometheus scrapes and load balancers
        .route("/health", get(system::health))
        .route("/metrics", get(system::metrics))
        .route("/api/v1/generate", post(logs::generate))
        .route("/api/v1/metrics", get(system::metrics))
        .route("/api/v1/logs", get(logs::list_logs))
        .route("/api/v1/logs/stats", get(logs::log_statistics))
        .route("/api/v1/scenarios/start", post(scenarios::start_scenario))
        .route("/api/v1/scenarios/stop", post(scenarios::stop_scenario))
        .route("/api/v1/scenarios/list", get(scenarios::list_scenarios))
        .route(
            "/api/v1/schedules",
            post(schedules::create_schedule).get(schedules::list_schedules),
        )
        .route(
            "/api/v1/schedules/{id}",
            get(schedules::get_schedule)
                .put(schedules::update_schedule)
                .delete(schedules::delete_schedule),
        )
        .route("/api/v1/schedules/{id}/enable", post(schedules::enable_schedule))
        .route("/api/v1/schedules/{id}/disable", post(schedules::disable_schedule))
        .route(
            "/api/v1/schedules/{id}/executions",
            get(schedules::list_executions),
        )
        .route("/api/v1/schedules/cron/examples", get(schedules::cron_examples))
        .route(
            "/api/v1/chains",
            post(chains::create_chain).get(chains::list_chains),
        )
        .route(
            "/api/v1/chains/{id}",
            get(chains::get_chain).delete(chains::delete_chain),
        )
        .route("/api/v1/chains/{id}/start", post(chains::start_chain))
        .route("/api/v1/chains/{id}/stop", post(chains::stop_chain))
        .route("/api/v1/chains/{id}/executions", get(chains::list_executions))
        .route(
            "/api/v1/chains/executions/active",
            get(chains::active_executions),
        )
        .route(
            "/api/v1/chains/schedules",
            post(chain_schedules::create_schedule).get(chain_schedules::list_schedules),
        )
        .route(
            "/api/v1/chains/schedules/{id}",
            get(chain_schedules::get_schedule)
                .put(chain_schedules::update_schedule)
                .delete(chain_schedules::delete_schedule),
        )
        .route(
            "/api/v1/chains/schedules/{id}/enable",
            post(chain_schedules::enable_schedule),
        )
        .route(
            "/api/v1/chains/schedules/{id}/disable",
            post(chain_schedules::disable_schedule),
        )
        .layer(permissive_cors())
        .with_state(state)
}
