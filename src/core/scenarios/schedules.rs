//! Cron-bound scenario schedules: validation, arming, firing, and the
//! execution trail.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::{ScenarioManager, new_id, validate_cron};
use crate::core::error::EngineError;
use crate::core::models::{ExecutionStatus, Schedule, ScheduleExecution, ScheduleUpdate};

impl ScenarioManager {
    /// Validates and registers a schedule; arms the cron entry when enabled.
    pub async fn create_schedule(
        self: &Arc<Self>,
        mut schedule: Schedule,
    ) -> Result<Schedule, EngineError> {
        if schedule.id.is_empty() {
            schedule.id = new_id();
        }
        validate_cron(&schedule.cron_expr)?;
        check_date_range(schedule.start_date, schedule.end_date)?;
        schedule.created_at = Utc::now();
        schedule.next_run = None;

        {
            let mut state = self.state.write().await;
            state.schedules.insert(schedule.id.clone(), schedule.clone());
        }
        self.storage.save_schedule(&schedule).await?;

        if schedule.enabled {
            self.arm_schedule(&mut schedule).await?;
        }

        info!("created schedule: {}", schedule.name);
        Ok(schedule)
    }

    /// Applies the allowed fields and re-arms or disarms the cron entry to
    /// match the new state.
    pub async fn update_schedule(
        self: &Arc<Self>,
        id: &str,
        updates: ScheduleUpdate,
    ) -> Result<Schedule, EngineError> {
        let mut schedule = {
            let state = self.state.read().await;
            state
                .schedules
                .get(id)
                .cloned()
                .ok_or_else(|| EngineError::NotFound("schedule", id.to_string()))?
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
            self.arm_schedule(&mut schedule).await?;
        } else {
            self.disarm_schedule(&mut schedule).await;
        }

        {
            let mut state = self.state.write().await;
            state.schedules.insert(schedule.id.clone(), schedule.clone());
        }
        self.storage.update_schedule(&schedule).await?;

        info!("updated schedule: {}", schedule.name);
        Ok(schedule)
    }

    pub async fn enable_schedule(self: &Arc<Self>, id: &str) -> Result<Schedule, EngineError> {
        let mut schedule = {
            let state = self.state.read().await;
            state
                .schedules
                .get(id)
                .cloned()
                .ok_or_else(|| EngineError::NotFound("schedule", id.to_string()))?
        };
        if schedule.enabled {
            return Err(EngineError::AlreadyEnabled);
        }

        schedule.enabled = true;
        self.arm_schedule(&mut schedule).await?;

        {
            let mut state = self.state.write().await;
            state.schedules.insert(schedule.id.clone(), schedule.clone());
        }
        if let Err(e) = self.storage.update_schedule(&schedule).await {
            warn!("failed to persist schedule {id}: {e}");
        }
        Ok(schedule)
    }

    pub async fn disable_schedule(&self, id: &str) -> Result<Schedule, EngineError> {
        let mut schedule = {
            let state = self.state.read().await;
            state
                .schedules
                .get(id)
                .cloned()
                .ok_or_else(|| EngineError::NotFound("schedule", id.to_string()))?
        };
        if !schedule.enabled {
            return Err(EngineError::AlreadyDisabled);
        }

        schedule.enabled = false;
        self.disarm_schedule(&mut schedule).await;

        {
            let mut state = self.state.write().await;
            state.schedules.insert(schedule.id.clone(), schedule.clone());
        }
        if let Err(e) = self.storage.update_schedule(&schedule).await {
            warn!("failed to persist schedule {id}: {e}");
        }
        Ok(schedule)
    }

    pub async fn delete_schedule(&self, id: &str) -> Result<(), EngineError> {
        let entry = {
            let mut state = self.state.write().await;
            state
                .schedules
                .remove(id)
                .ok_or_else(|| EngineError::NotFound("schedule", id.to_string()))?;
            state.cron_entries.remove(id)
        };
        if let Some(entry) = entry {
            self.remove_cron_entry(entry).await;
        }
        self.storage.delete_schedule(id).await?;
        info!("deleted schedule: {id}");
        Ok(())
    }

    pub async fn schedule(&self, id: &str) -> Option<Schedule> {
        self.state.read().await.schedules.get(id).cloned()
    }

    pub async fn schedules(&self) -> Vec<Schedule> {
        let state = self.state.read().await;
        let mut schedules: Vec<Schedule> = state.schedules.values().cloned().collect();
        schedules.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        schedules
    }

    pub async fn schedule_executions(
        &self,
        schedule_id: &str,
        limit: usize,
    ) -> Result<Vec<ScheduleExecution>, EngineError> {
        Ok(self.storage.executions(schedule_id, limit).await?)
    }

    /// Arms (or re-arms) the cron entry for a schedule and refreshes
    /// `next_run` from the runtime. A schedule already past its activation
    /// window is auto-disabled instead.
    pub(super) async fn arm_schedule(
        self: &Arc<Self>,
        schedule: &mut Schedule,
    ) -> Result<(), EngineError> {
        let now = Utc::now();
        if let Some(start) = schedule.start_date {
            if now < start {
                info!("schedule {} becomes active at {start}", schedule.name);
            }
        }
        if let Some(end) = schedule.end_date {
            if now > end {
                info!("schedule {} is past its end date {end}", schedule.name);
                schedule.enabled = false;
                schedule.next_run = None;
                let mut state = self.state.write().await;
                state.schedules.insert(schedule.id.clone(), schedule.clone());
                drop(state);
                if let Err(e) = self.storage.update_schedule(schedule).await {
                    warn!("failed to persist schedule {}: {e}", schedule.id);
                }
                return Ok(());
            }
        }

        let normalized = validate_cron(&schedule.cron_expr)?;

        let stale = {
            let mut state = self.state.write().await;
            state.cron_entries.remove(&schedule.id)
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
                    manager.run_scheduled_scenario(schedule_id).await;
                })
            })
            .await?;

        {
            let mut state = self.state.write().await;
            state.cron_entries.insert(schedule.id.clone(), entry);
        }

        schedule.next_run = self.next_tick(entry).await;
        {
            let mut state = self.state.write().await;
            state.schedules.insert(schedule.id.clone(), schedule.clone());
        }
        if let Err(e) = self.storage.update_schedule(schedule).await {
            warn!("failed to persist schedule {}: {e}", schedule.id);
        }

        info!(
            "schedule {} armed, next run {:?}",
            schedule.name, schedule.next_run
        );
        Ok(())
    }

    async fn disarm_schedule(&self, schedule: &mut Schedule) {
        let entry = {
            let mut state = self.state.write().await;
            state.cron_entries.remove(&schedule.id)
        };
        if let Some(entry) = entry {
            self.remove_cron_entry(entry).await;
        }
        schedule.next_run = None;
    }

    /// Cron callback. Honors the activation window, records an execution,
    /// and dispatches the scenario. The execution trail records dispatches,
    /// not completions of the underlying generation.
    pub(super) async fn run_scheduled_scenario(self: Arc<Self>, schedule_id: String) {
        let schedule = {
            let state = self.state.read().await;
            match state.schedules.get(&schedule_id) {
                Some(s) => s.clone(),
                None => {
                    warn!("cron fired for unknown schedule {schedule_id}");
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
                self.auto_disable_schedule(&schedule_id).await;
                return;
            }
        }

        let mut execution = ScheduleExecution {
            id: new_id(),
            schedule_id: schedule.id.clone(),
            scenario_type: schedule.scenario_type.clone(),
            status: ExecutionStatus::Running,
            started_at: now,
            completed_at: None,
            error: None,
            logs_count: None,
        };
        if let Err(e) = self.storage.save_execution(&execution).await {
            warn!("failed to persist execution {}: {e}", execution.id);
        }

        info!(
            "schedule fired: {} -> {}",
            schedule.name, schedule.scenario_type
        );

        if let Err(e) = self.start_scenario(&schedule.scenario_type, None).await {
            warn!("schedule {} failed to dispatch: {e}", schedule.name);
            execution.status = ExecutionStatus::Failed;
            execution.error = Some(e.to_string());
            execution.completed_at = Some(Utc::now());
            if let Err(e) = self.storage.save_execution(&execution).await {
                warn!("failed to persist execution {}: {e}", execution.id);
            }
            return;
        }

        execution.status = ExecutionStatus::Completed;
        execution.completed_at = Some(Utc::now());
        if let Err(e) = self.storage.save_execution(&execution).await {
            warn!("failed to persist execution {}: {e}", execution.id);
        }

        let entry = {
            let state = self.state.read().await;
            state.cron_entries.get(&schedule_id).copied()
        };
        let next_run = match entry {
            Some(entry) => self.next_tick(entry).await,
            None => None,
        };

        let persisted = {
            let mut state = self.state.write().await;
            state.schedules.get_mut(&schedule_id).map(|s| {
                s.last_run = Some(Utc::now());
                if next_run.is_some() {
                    s.next_run = next_run;
                }
                s.clone()
            })
        };
        if let Some(schedule) = persisted {
            if let Err(e) = self.storage.update_schedule(&schedule).await {
                warn!("failed to persist schedule {}: {e}", schedule.id);
            }
        }

        info!("schedule completed: {}", schedule.name);
    }

    /// The firing found the schedule past its end date: disable it and drop
    /// the cron entry without recording an execution.
    async fn auto_disable_schedule(&self, schedule_id: &str) {
        let (snapshot, entry) = {
            let mut state = self.state.write().await;
            let snapshot = state.schedules.get_mut(schedule_id).map(|s| {
                s.enabled = false;
                s.next_run = None;
                s.clone()
            });
            (snapshot, state.cron_entries.remove(schedule_id))
        };
        if let Some(entry) = entry {
            self.remove_cron_entry(entry).await;
        }
        if let Some(schedule) = snapshot {
            if let Err(e) = self.storage.update_schedule(&schedule).await {
                warn!("failed to persist schedule {}: {e}", schedule.id);
            }
            info!("schedule {} auto-disabled", schedule.name);
        }
    }
}

pub(super) fn check_date_range(
    start: Option<chrono::DateTime<Utc>>,
    end: Option<chrono::DateTime<Utc>>,
) -> Result<(), EngineError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(EngineError::InvalidDateRange),
        _ => Ok(()),
    }
}
