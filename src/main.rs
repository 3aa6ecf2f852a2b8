mod config;
mod core;
mod interfaces;
mod logging;

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use crate::config::Settings;
use crate::core::generator::{Generator, GeneratorStats};
use crate::core::scenarios::ScenarioManager;
use crate::core::storage::MemoryStorage;
use crate::interfaces::web::ApiServer;

#[tokio::main]
async fn main() {
    let settings = Settings::from_env();
    logging::init(&settings);

    if let Err(e) = run(settings).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

async fn run(settings: Settings) -> Result<()> {
    let storage = Arc::new(MemoryStorage::new());
    let stats = Arc::new(GeneratorStats::default());
    let generator = Arc::new(Generator::new(stats));

    let manager = ScenarioManager::start(storage, generator.clone()).await?;

    info!(
        "load simulator starting in {} mode",
        settings.environment.as_str()
    );
    info!("health check: http://localhost:{}/health", settings.port);
    info!("prometheus metrics: http://localhost:{}/metrics", settings.port);
    info!("api: http://localhost:{}/api/v1/", settings.port);

    let server = ApiServer::new(manager.clone(), generator, settings.port);
    server.serve().await?;

    manager.stop().await;
    Ok(())
}
