//! Boot-time rehydration: active scenarios resume their workers, enabled
//! schedules re-arm their cron entries, and chain executions left running by
//! a previous process are marked failed for operator inspection.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use super::ScenarioManager;
use crate::core::models::ChainStatus;

impl ScenarioManager {
    pub(super) async fn restore_state(self: &Arc<Self>) {
        let scenarios = match self.storage.active_scenarios().await {
            Ok(scenarios) => scenarios,
            Err(e) => {
                error!("failed to restore active scenarios: {e}");
                return;
            }
        };
        for scenario in scenarios {
            {
                let mut state = self.state.write().await;
                state
                    .active_scenarios
                    .insert(scenario.kind.clone(), scenario.clone());
            }
            info!("restored active scenario: {}", scenario.config.name);
            let manager = Arc::clone(self);
            tokio::spawn(async move {
                manager.run_scenario(scenario).await;
            });
        }

        let schedules = match self.storage.schedules().await {
            Ok(schedules) => schedules,
            Err(e) => {
                error!("failed to restore schedules: {e}");
                return;
            }
        };
        for mut schedule in schedules {
            {
                let mut state = self.state.write().await;
                state.schedules.insert(schedule.id.clone(), schedule.clone());
            }
            if schedule.enabled {
                match self.arm_schedule(&mut schedule).await {
                    Ok(()) => info!("restored schedule: {}", schedule.name),
                    Err(e) => warn!("failed to restore schedule {}: {e}", schedule.name),
                }
            }
        }

        let chain_schedules = match self.storage.chain_schedules().await {
            Ok(schedules) => schedules,
            Err(e) => {
                error!("failed to restore chain schedules: {e}");
                return;
            }
        };
        for mut schedule in chain_schedules {
            {
                let mut state = self.state.write().await;
                state
                    .chain_schedules
                    .insert(schedule.id.clone(), schedule.clone());
            }
            if schedule.enabled {
                match self.arm_chain_schedule(&mut schedule).await {
                    Ok(()) => info!("restored chain schedule: {}", schedule.name),
                    Err(e) => warn!("failed to restore chain schedule {}: {e}", schedule.name),
                }
            }
        }

        // Chain executions are not resumed across restarts.
        match self.storage.running_chain_executions().await {
            Ok(stale) => {
                for mut execution in stale {
                    execution.status = ChainStatus::Failed;
                    execution.error = Some("process restarted".to_string());
                    execution.completed_at = Some(Utc::now());
                    if let Err(e) = self.storage.update_chain_execution(&execution).await {
                        warn!("failed to mark stale chain execution {}: {e}", execution.id);
                    } else {
                        warn!(
                            "chain execution {} was running at shutdown, marked failed",
                            execution.id
                        );
                    }
                }
            }
            Err(e) => error!("failed to inspect chain executions: {e}"),
        }
    }
}
