//! Cron-bound chains. Firings resolve a built-in chain and launch it through
//! the chain engine's worker, so scheduled runs leave the same execution
//! trail as manual ones.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use super::schedules::check_date_range;
use super::{ScenarioManager, new_id, validate_cron};
use crate::core::catalog;
use crate::core::error::EngineError;
use crate::core::models::{
    ChainBlueprint, ChainSchedule, ChainScheduleUpdate, ChainStatus, ChainStep, ScenarioChain,
};

impl ScenarioManager {
    pub async fn create_chain_schedule(
        self: &Arc<Self>,
        mut schedule: ChainSchedule,
    ) -> Result<ChainSchedule, EngineError> {
        if schedule.id.is_empty() {
            schedule.id = new_id();
        }
        if catalog::find_chain(&schedule.chain_name).is_none() {
            return Err(EngineError::UnknownChain(schedule.chain_name.clone()));
        }
        validate_cron(&schedule.cron_expr)?;
        check_date_range(schedule.start_date, schedule.end_date)?;
        schedule.created_at = Utc::now();
        schedule.next_run = None;

        {
            let mut state = self.state.write().await;
            state
                .chain_schedules
                .insert(schedule.id.clone(), schedule.clone());
        }
        self.storage.save_chain_schedule(&schedule).await?;

        if schedule.enabled {
            self.arm_chain_schedule(&mut schedule).await?;
        }

        info!("created chain schedule: {}", schedule.name);
        Ok(schedule)
    }

    pub async fn update_chain_schedule(
        self: &Arc<Self>,
        id: &str,
        updates: ChainScheduleUpdate,
    ) -> Result<ChainSchedule, EngineError> {
        let mut schedule = {
            let state = self.state.read().await;
            state
                .chain_schedules
                .get(id)
                .cloned()
                .ok_or_else(|| EngineError::NotFound("chain schedule", id.to_string()))?
        };

        if let Some(name) = updates.name {
            schedule.name = name;
        }
        if let Some(cron_expr) = updates.cron_expr {
            validate_cron(&cron_expr)?;
            schedule.cron_expr = cron_expr;
        }
        if let Some(enabled) = updates.enabled {
            schedule.enabled = enabled;
        }
        if let Some(start) = updates.start_date {
            schedule.start_date = Some(start);
        }
        if let Some(end) = updates.end_date {
            schedule.end_date = Some(end);
        }
        check_date_range(schedule.start_date, schedule.end_date)?;

        if schedule.enabled {
            self.arm_chain_schedule(&mut schedule).await?;
        } else {
            self.disarm_chain_schedule(&mut schedule).await;
        }

        {
            let mut state = self.state.write().await;
            state
                .chain_schedules
                .insert(schedule.id.clone(), schedule.clone());
        }
        self.storage.update_chain_schedule(&schedule).await?;

        info!("updated chain schedule: {}", schedule.name);
        Ok(schedule)
    }

    pub async fn enable_chain_schedule(
        self: &Arc<Self>,
        id: &str,
    ) -> Result<ChainSchedule, EngineError> {
        let mut schedule = {
            let state = self.state.read().await;
            state
                .chain_schedules
                .get(id)
                .cloned()
                .ok_or_else(|| EngineError::NotFound("chain schedule", id.to_string()))?
        };
        if schedule.enabled {
            return Err(EngineError::AlreadyEnabled);
        }

        schedule.enabled = true;
        self.arm_chain_schedule(&mut schedule).await?;

        {
            let mut state = self.state.write().await;
            state
                .chain_schedules
                .insert(schedule.id.clone(), schedule.clone());
        }
        if let Err(e) = self.storage.update_chain_schedule(&schedule).await {
            warn!("failed to persist chain schedule {id}: {e}");
        }
        Ok(schedule)
    }

    pub async fn disable_chain_schedule(&self, id: &str) -> Result<ChainSchedule, EngineError> {
        let mut schedule = {
            let state = self.state.read().await;
            state
                .chain_schedules
                .get(id)
                .cloned()
                .ok_or_else(|| EngineError::NotFound("chain schedule", id.to_string()))?
        };
        if !schedule.enabled {
            return Err(EngineError::AlreadyDisabled);
        }

        schedule.enabled = false;
        self.disarm_chain_schedule(&mut schedule).await;

        {
            let mut state = self.state.write().await;
            state
                .chain_schedules
                .insert(schedule.id.clone(), schedule.clone());
        }
        if let Err(e) = self.storage.update_chain_schedule(&schedule).await {
            warn!("failed to persist chain schedule {id}: {e}");
        }
        Ok(schedule)
    }

    pub async fn delete_chain_schedule(&self, id: &str) -> Result<(), EngineError> {
        let entry = {
            let mut state = self.state.write().await;
            state
                .chain_schedules
                .remove(id)
                .ok_or_else(|| EngineError::NotFound("chain schedule", id.to_string()))?;
            state.chain_cron_entries.remove(id)
        };
        if let Some(entry) = entry {
            self.remove_cron_entry(entry).await;
        }
        self.storage.delete_chain_schedule(id).await?;
        info!("deleted chain schedule: {id}");
        Ok(())
    }

    pub async fn chain_schedule(&self, id: &str) -> Option<ChainSchedule> {
        self.state.read().await.chain_schedules.get(id).cloned()
    }

    pub async fn chain_schedules(&self) -> Vec<ChainSchedule> {
        let state = self.state.read().await;
        let mut schedules: Vec<ChainSchedule> = state.chain_schedules.values().cloned().collect();
        schedules.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        schedules
    }

    pub(super) async fn arm_chain_schedule(
        self: &Arc<Self>,
        schedule: &mut ChainSchedule,
    ) -> Result<(), EngineError> {
        let now = Utc::now();
        if let Some(start) = schedule.start_date {
            if now < start {
                info!("chain schedule {} becomes active at {start}", schedule.name);
            }
        }
        if let Some(end) = schedule.end_date {
            if now > end {
                info!("chain schedule {} is past its end date {end}", schedule.name);
                schedule.enabled = false;
                schedule.next_run = None;
                let mut state = self.state.write().await;
                state
                    .chain_schedules
                    .insert(schedule.id.clone(), schedule.clone());
                drop(state);
                if let Err(e) = self.storage.update_chain_schedule(schedule).await {
                    warn!("failed to persist chain schedule {}: {e}", schedule.id);
                }
                return Ok(());
            }
        }

        let normalized = validate_cron(&schedule.cron_expr)?;

        let stale = {
            let mut state = self.state.write().await;
            state.chain_cron_entries.remove(&schedule.id)
        };
        if let Some(stale) = stale {
            self.remove_cron_entry(stale).await;
        }

        let manager = Arc::clone(self);
        let schedule_id = schedule.id.clone();
        let entry = self
            .add_cron_entry(&normalized, move |_uuid, mut _lock| {
                let manager = manager.clone();
                let schedule_id = schedule_id.clone();
                Box::pin(async move {
                    manager.run_scheduled_chain(schedule_id).await;
                })
            })
            .await?;

        {
            let mut state = self.state.write().await;
            state.chain_cron_entries.insert(schedule.id.clone(), entry);
        }

        schedule.next_run = self.next_tick(entry).await;
        {
            let mut state = self.state.write().await;
            state
                .chain_schedules
                .insert(schedule.id.clone(), schedule.clone());
        }
        if let Err(e) = self.storage.update_chain_schedule(schedule).await {
            warn!("failed to persist chain schedule {}: {e}", schedule.id);
        }

        info!(
            "chain schedule {} armed, next run {:?}",
            schedule.name, schedule.next_run
        );
        Ok(())
    }

    async fn disarm_chain_schedule(&self, schedule: &mut ChainSchedule) {
        let entry = {
            let mut state = self.state.write().await;
            state.chain_cron_entries.remove(&schedule.id)
        };
        if let Some(entry) = entry {
            self.remove_cron_entry(entry).await;
        }
        schedule.next_run = None;
    }

    /// Cron callback: resolve the built-in chain and launch it through the
    /// chain engine so the firing leaves a ChainExecution record.
    pub(super) async fn run_scheduled_chain(self: Arc<Self>, schedule_id: String) {
        let schedule = {
            let state = self.state.read().await;
            match state.chain_schedules.get(&schedule_id) {
                Some(s) => s.clone(),
                None => {
                    warn!("cron fired for unknown chain schedule {schedule_id}");
                    return;
                }
            }
        };

        let now = Utc::now();
        if let Some(start) = schedule.start_date {
            if now < start {
                return;
            }
        }
        if let Some(end) = schedule.end_date {
            if now > end {
                self.auto_disable_chain_schedule(&schedule_id).await;
                return;
            }
        }

        let Some(blueprint) = catalog::find_chain(&schedule.chain_name) else {
            error!("chain schedule {} targets unknown chain {}", schedule.name, schedule.chain_name);
            return;
        };

        info!(
            "chain schedule fired: {} -> {}",
            schedule.name, blueprint.name
        );

        match self.ensure_builtin_chain(blueprint).await {
            Ok(chain) => {
                if let Err(e) = self.start_chain(&chain.id).await {
                    error!("chain schedule {} failed to dispatch: {e}", schedule.name);
                }
            }
            Err(e) => {
                error!("chain schedule {} could not materialize chain: {e}", schedule.name);
            }
        }

        let entry = {
            let state = self.state.read().await;
            state.chain_cron_entries.get(&schedule_id).copied()
        };
        let next_run = match entry {
            Some(entry) => self.next_tick(entry).await,
            None => None,
        };

        let persisted = {
            let mut state = self.state.write().await;
            state.chain_schedules.get_mut(&schedule_id).map(|s| {
                s.last_run = Some(Utc::now());
                if next_run.is_some() {
                    s.next_run = next_run;
                }
                s.clone()
            })
        };
        if let Some(schedule) = persisted {
            if let Err(e) = self.storage.update_chain_schedule(&schedule).await {
                warn!("failed to persist chain schedule {}: {e}", schedule.id);
            }
        }
    }

    async fn auto_disable_chain_schedule(&self, schedule_id: &str) {
        let (snapshot, entry) = {
            let mut state = self.state.write().await;
            let snapshot = state.chain_schedules.get_mut(schedule_id).map(|s| {
                s.enabled = false;
                s.next_run = None;
                s.clone()
            });
            (snapshot, state.chain_cron_entries.remove(schedule_id))
        };
        if let Some(entry) = entry {
            self.remove_cron_entry(entry).await;
        }
        if let Some(schedule) = snapshot {
            if let Err(e) = self.storage.update_chain_schedule(&schedule).await {
                warn!("failed to persist chain schedule {}: {e}", schedule.id);
            }
            info!("chain schedule {} auto-disabled", schedule.name);
        }
    }

    /// Finds the stored materialization of a built-in chain, creating it on
    /// first use so every firing reuses one chain id.
    async fn ensure_builtin_chain(
        &self,
        blueprint: &ChainBlueprint,
    ) -> Result<ScenarioChain, EngineError> {
        let existing = self.storage.chains().await?;
        if let Some(chain) = existing.into_iter().find(|c| c.name == blueprint.name) {
            return Ok(chain);
        }

        let chain = ScenarioChain {
            id: new_id(),
            name: blueprint.name.to_string(),
            description: blueprint.description.to_string(),
            steps: blueprint
                .steps
                .iter()
                .enumerate()
                .map(|(index, kind)| ChainStep {
                    scenario_type: kind.to_string(),
                    name: kind.to_string(),
                    config: None,
                    delay_before: 0,
                    order: index,
                })
                .collect(),
            status: ChainStatus::Pending,
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
        };
        self.storage.save_chain(&chain).await?;
        info!("materialized built-in chain: {}", chain.name);
        Ok(chain)
    }
}
