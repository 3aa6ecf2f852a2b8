//! Engine-level tests: resolution rules, schedule arming, worker lifecycles,
//! chain runs, and restore behavior.

mod config_resolution;
mod scenario_lifecycle;
mod schedule_rules;

use std::sync::Arc;
use std::time::Duration;

use crate::core::generator::{Generator, GeneratorStats};
use crate::core::scenarios::ScenarioManager;
use crate::core::storage::MemoryStorage;

pub(super) async fn manager_with_store() -> (Arc<ScenarioManager>, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let generator = Arc::new(Generator::new(Arc::new(GeneratorStats::default())));
    let manager = ScenarioManager::start(storage.clone(), generator)
        .await
        .expect("manager should start");
    (manager, storage)
}

pub(super) async fn manager_from(storage: Arc<MemoryStorage>) -> Arc<ScenarioManager> {
    let generator = Arc::new(Generator::new(Arc::new(GeneratorStats::default())));
    ScenarioManager::start(storage, generator)
        .await
        .expect("manager should start")
}

/// Polls `check` every 50ms until it returns true or the deadline passes.
pub(super) async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
