//! Scenario orchestration: active scenario registry, worker execution modes,
//! cron-bound schedules, multi-step chains, and state restore.

mod chain_schedules;
mod chains;
mod restore;
mod schedules;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::{RwLock, watch};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};
use uuid::Uuid;

use super::catalog;
use super::error::EngineError;
use super::generator::Generator;
use super::models::{ChainBlueprint, ChainExecution, ChainSchedule, Scenario, ScenarioConfig, Schedule};
use super::storage::Storage;

/// The six registries co-owned by the engines, guarded by one coarse lock.
/// Write operations hold the writer half; list/get operations snapshot under
/// the reader half. The lock is never held across store calls that could
/// block.
#[derive(Default)]
struct EngineState {
    active_scenarios: HashMap<String, Scenario>,
    schedules: HashMap<String, Schedule>,
    active_chains: HashMap<String, ChainExecution>,
    cron_entries: HashMap<String, Uuid>,
    chain_schedules: HashMap<String, ChainSchedule>,
    chain_cron_entries: HashMap<String, Uuid>,
}

pub struct ScenarioManager {
    storage: Arc<dyn Storage>,
    generator: Arc<Generator>,
    state: RwLock<EngineState>,
    scheduler: JobScheduler,
    shutdown_tx: watch::Sender<bool>,
}

impl ScenarioManager {
    /// Builds the manager, restores persisted state, and starts the cron
    /// runtime.
    pub async fn start(
        storage: Arc<dyn Storage>,
        generator: Arc<Generator>,
    ) -> anyhow::Result<Arc<Self>> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| anyhow!("failed to create cron scheduler: {e}"))?;
        let (shutdown_tx, _) = watch::channel(false);

        let manager = Arc::new(Self {
            storage,
            generator,
            state: RwLock::new(EngineState::default()),
            scheduler,
            shutdown_tx,
        });

        manager.restore_state().await;

        manager
            .scheduler
            .clone()
            .start()
            .await
            .map_err(|e| anyhow!("failed to start cron scheduler: {e}"))?;

        info!("scenario manager started");
        Ok(manager)
    }

    /// Signals all workers to wind down and stops the cron runtime. In-flight
    /// workers exit at their next suspension point or step boundary.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        let mut scheduler = self.scheduler.clone();
        if let Err(e) = scheduler.shutdown().await {
            warn!("cron scheduler shutdown failed: {e}");
        }
        info!("scenario manager stopped");
    }

    pub fn available_scenarios(&self) -> &'static HashMap<&'static str, ScenarioConfig> {
        catalog::predefined_scenarios()
    }

    pub fn available_chains(&self) -> &'static [ChainBlueprint] {
        catalog::PREDEFINED_CHAINS
    }

    pub async fn active_scenarios(&self) -> Vec<Scenario> {
        let state = self.state.read().await;
        let mut scenarios: Vec<Scenario> = state.active_scenarios.values().cloned().collect();
        scenarios.sort_by(|a, b| a.kind.cmp(&b.kind));
        scenarios
    }

    /// Resolves a scenario kind against the catalogue and registers a new
    /// active instance. An already-active kind is soft-replaced: the previous
    /// worker keeps running until it next observes that its registration is
    /// gone. Returns as soon as the worker is spawned.
    pub async fn start_scenario(
        self: &Arc<Self>,
        kind: &str,
        custom: Option<&HashMap<String, Value>>,
    ) -> Result<(), EngineError> {
        let scenario = resolve_scenario(kind, custom)?;

        {
            let mut state = self.state.write().await;
            state
                .active_scenarios
                .insert(scenario.kind.clone(), scenario.clone());
        }

        if let Err(e) = self.storage.save_scenario(&scenario).await {
            warn!("failed to persist scenario {kind}: {e}");
        }

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            manager.run_scenario(scenario).await;
        });

        Ok(())
    }

    /// Marks the active scenario inactive. The worker observes the flag at
    /// its next tick; this call does not block on worker exit.
    pub async fn stop_scenario(&self, kind: &str) -> Result<(), EngineError> {
        let snapshot = {
            let mut state = self.state.write().await;
            let scenario = state
                .active_scenarios
                .get_mut(kind)
                .filter(|s| s.active)
                .ok_or_else(|| EngineError::NotActive(kind.to_string()))?;
            scenario.active = false;
            scenario.clone()
        };

        if let Err(e) = self.storage.update_scenario(&snapshot).await {
            warn!("failed to persist scenario {kind}: {e}");
        }

        info!("stopped scenario: {}", snapshot.config.name);
        Ok(())
    }

    // --- Worker execution ---

    async fn run_scenario(self: Arc<Self>, scenario: Scenario) {
        info!("executing scenario {}", scenario.config.name);

        if let Some(start) = scenario.start_date {
            let now = Utc::now();
            if now < start {
                let wait = (start - now).to_std().unwrap_or(Duration::ZERO);
                info!(
                    "waiting until scenario start date {start} ({}s)",
                    wait.as_secs()
                );
                if !self.interruptible_sleep(wait).await {
                    // Engine shutdown: leave the registration for restore.
                    return;
                }
            }
        }

        let graceful = if scenario.interval_secs.unwrap_or(0) > 0 {
            self.run_periodic(&scenario).await
        } else if scenario.duration_secs.unwrap_or(0) > 0 || scenario.end_date.is_some() {
            self.run_timed(&scenario).await
        } else {
            self.run_one_shot(&scenario).await
        };

        if !graceful {
            return;
        }

        let mut finished = scenario;
        finished.active = false;
        let owns_slot = {
            let mut state = self.state.write().await;
            let owns = state
                .active_scenarios
                .get(&finished.kind)
                .is_some_and(|current| current.launch_id == finished.launch_id);
            if owns {
                state.active_scenarios.remove(&finished.kind);
            }
            owns
        };

        // A replaced worker leaves the registry and the store to the newer
        // registration of its kind.
        if owns_slot {
            if let Err(e) = self.storage.update_scenario(&finished).await {
                warn!("failed to persist scenario {}: {e}", finished.kind);
            }
            if let Err(e) = self.storage.delete_scenario(&finished.kind).await {
                warn!("failed to remove scenario {}: {e}", finished.kind);
            }
        }

        info!("finished scenario: {}", finished.config.name);
    }

    /// One batch per interval tick until deactivated, past the end date, or
    /// shut down.
    async fn run_periodic(&self, scenario: &Scenario) -> bool {
        let period = Duration::from_secs(scenario.interval_secs.unwrap_or(1).max(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await; // the immediate first tick
        let mut shutdown = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => return false,
            }

            if !self.scenario_is_live(scenario).await {
                return true;
            }
            if let Some(end) = scenario.end_date {
                if Utc::now() > end {
                    info!("scenario {} reached its end date {end}", scenario.kind);
                    return true;
                }
            }

            self.generator
                .generate(scenario.config.log_count, &scenario.config.name)
                .await;
        }
    }

    /// Fixed 10-second pulses sized so the emitted total approximates the
    /// configured log count across the window.
    async fn run_timed(&self, scenario: &Scenario) -> bool {
        let end_time = scenario.end_date.unwrap_or_else(|| {
            match scenario.duration_secs {
                Some(secs) if secs > 0 => Utc::now() + chrono::Duration::seconds(secs as i64),
                _ => Utc::now() + chrono::Duration::days(365),
            }
        });

        let mut ticker = tokio::time::interval(Duration::from_secs(10));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;
        let mut shutdown = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => return false,
            }

            if !self.scenario_is_live(scenario).await {
                return true;
            }
            let now = Utc::now();
            if now > end_time {
                info!("scenario {} reached its end time {end_time}", scenario.kind);
                return true;
            }

            let seconds_remaining = (end_time - now).num_seconds().max(0) as usize;
            let pulses_remaining = (seconds_remaining / 10).max(1);
            let batch = (scenario.config.log_count / pulses_remaining).max(1);
            self.generator.generate(batch, &scenario.config.name).await;
        }
    }

    async fn run_one_shot(&self, scenario: &Scenario) -> bool {
        self.generator
            .generate(scenario.config.log_count, &scenario.config.name)
            .await;
        true
    }

    /// Whether the registry slot still belongs to this worker's registration
    /// and is active. The launch id comparison keeps an old worker from
    /// reacting to (or tearing down) a replacement instance of its kind.
    async fn scenario_is_live(&self, scenario: &Scenario) -> bool {
        let state = self.state.read().await;
        state
            .active_scenarios
            .get(&scenario.kind)
            .is_some_and(|current| current.launch_id == scenario.launch_id && current.active)
    }

    /// Sleeps for `duration`, returning false when interrupted by engine
    /// shutdown.
    async fn interruptible_sleep(&self, duration: Duration) -> bool {
        let mut shutdown = self.shutdown_tx.subscribe();
        if *shutdown.borrow() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = shutdown.changed() => false,
        }
    }

    // --- Cron plumbing shared by schedule engines ---

    async fn add_cron_entry(
        &self,
        normalized_expr: &str,
        job_fn: impl FnMut(Uuid, JobScheduler) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
            + Send
            + Sync
            + 'static,
    ) -> Result<Uuid, EngineError> {
        let job = Job::new_async(normalized_expr, job_fn)
            .map_err(|e| EngineError::InvalidCron(e.to_string()))?;
        self.scheduler
            .clone()
            .add(job)
            .await
            .map_err(|e| EngineError::Internal(anyhow!("failed to register cron entry: {e}")))
    }

    async fn remove_cron_entry(&self, entry: Uuid) {
        if let Err(e) = self.scheduler.clone().remove(&entry).await {
            warn!("failed to remove cron entry {entry}: {e}");
        }
    }

    async fn next_tick(&self, entry: Uuid) -> Option<DateTime<Utc>> {
        let mut scheduler = self.scheduler.clone();
        match scheduler.next_tick_for_job(entry).await {
            Ok(next) => next,
            Err(e) => {
                warn!("failed to read next fire time for {entry}: {e}");
                None
            }
        }
    }
}

/// Resolves a kind against the catalogue and merges the recognised custom
/// config keys over a deep copy of the predefined config.
fn resolve_scenario(
    kind: &str,
    custom: Option<&HashMap<String, Value>>,
) -> Result<Scenario, EngineError> {
    let base = catalog::predefined_scenarios()
        .get(kind)
        .ok_or_else(|| EngineError::UnknownScenario(kind.to_string()))?;
    let mut config = base.clone();

    let mut duration_secs = None;
    let mut interval_secs = None;
    let mut start_date = None;
    let mut end_date = None;

    if let Some(custom) = custom {
        if let Some(count) = custom.get("log_count").and_then(Value::as_f64) {
            config.log_count = count.max(0.0) as usize;
        }
        if let Some(labels) = custom.get("labels").and_then(Value::as_object) {
            for (key, value) in labels {
                if let Some(text) = value.as_str() {
                    config.labels.insert(key.clone(), text.to_string());
                }
            }
        }
        // When both units are supplied, the later key wins.
        if let Some(minutes) = custom.get("duration_minutes").and_then(Value::as_f64) {
            duration_secs = Some((minutes * 60.0) as u64);
        }
        if let Some(seconds) = custom.get("duration_seconds").and_then(Value::as_f64) {
            duration_secs = Some(seconds as u64);
        }
        if let Some(seconds) = custom.get("interval_seconds").and_then(Value::as_f64) {
            interval_secs = Some(seconds as u64);
        }
        if let Some(minutes) = custom.get("interval_minutes").and_then(Value::as_f64) {
            interval_secs = Some((minutes * 60.0) as u64);
        }
        if let Some(text) = custom.get("start_date").and_then(Value::as_str) {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
                start_date = Some(parsed.with_timezone(&Utc));
            }
        }
        if let Some(text) = custom.get("end_date").and_then(Value::as_str) {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
                end_date = Some(parsed.with_timezone(&Utc));
            }
        }
    }

    Ok(Scenario {
        kind: kind.to_string(),
        active: true,
        config,
        started: Utc::now(),
        duration_secs,
        interval_secs,
        start_date,
        end_date,
        launch_id: Uuid::new_v4(),
    })
}

/// Maps a standard 5-field cron expression onto the runtime's 6-field form
/// by prefixing a zero seconds field. 6-field input passes through.
fn normalize_cron(expr: &str) -> Option<String> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    match fields.len() {
        5 => Some(format!("0 {}", fields.join(" "))),
        6 => Some(fields.join(" ")),
        _ => None,
    }
}

/// Validates an operator-supplied cron expression and returns the normalized
/// form the runtime is armed with.
fn validate_cron(expr: &str) -> Result<String, EngineError> {
    let normalized = normalize_cron(expr)
        .ok_or_else(|| EngineError::InvalidCron(format!("expected 5 or 6 fields: {expr:?}")))?;
    Job::new(normalized.as_str(), |_uuid, _lock| {})
        .map_err(|e| EngineError::InvalidCron(e.to_string()))?;
    Ok(normalized)
}

/// Reads the step-duration hint from a chain step config. First recognised
/// key wins.
fn duration_from_config(config: Option<&HashMap<String, Value>>) -> Option<Duration> {
    let config = config?;
    for (key, factor) in [
        ("duration_seconds", 1.0),
        ("duration_minutes", 60.0),
        ("duration_hours", 3600.0),
    ] {
        if let Some(value) = config.get(key).and_then(Value::as_f64) {
            if value > 0.0 {
                return Some(Duration::from_secs_f64(value * factor));
            }
        }
    }
    None
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}
