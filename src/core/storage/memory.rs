use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::Storage;
use crate::core::models::{
    ChainExecution, ChainSchedule, ChainStatus, Scenario, ScenarioChain, Schedule,
    ScheduleExecution,
};

/// In-memory storage backend. Each collection carries its own lock so the
/// engines never contend across entity kinds.
#[derive(Default)]
pub struct MemoryStorage {
    scenarios: RwLock<HashMap<String, Scenario>>,
    schedules: RwLock<HashMap<String, Schedule>>,
    executions: RwLock<HashMap<String, ScheduleExecution>>,
    chains: RwLock<HashMap<String, ScenarioChain>>,
    chain_executions: RwLock<HashMap<String, ChainExecution>>,
    chain_schedules: RwLock<HashMap<String, ChainSchedule>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn save_scenario(&self, scenario: &Scenario) -> Result<()> {
        self.scenarios
            .write()
            .await
            .insert(scenario.kind.clone(), scenario.clone());
        Ok(())
    }

    async fn active_scenarios(&self) -> Result<Vec<Scenario>> {
        Ok(self
            .scenarios
            .read()
            .await
            .values()
            .filter(|s| s.active)
            .cloned()
            .collect())
    }

    async fn update_scenario(&self, scenario: &Scenario) -> Result<()> {
        self.scenarios
            .write()
            .await
            .insert(scenario.kind.clone(), scenario.clone());
        Ok(())
    }

    async fn delete_scenario(&self, kind: &str) -> Result<()> {
        self.scenarios.write().await.remove(kind);
        Ok(())
    }

    async fn save_schedule(&self, schedule: &Schedule) -> Result<()> {
        self.schedules
            .write()
            .await
            .insert(schedule.id.clone(), schedule.clone());
        Ok(())
    }

    async fn schedules(&self) -> Result<Vec<Schedule>> {
        Ok(self.schedules.read().await.values().cloned().collect())
    }

    async fn schedule(&self, id: &str) -> Result<Option<Schedule>> {
        Ok(self.schedules.read().await.get(id).cloned())
    }

    async fn update_schedule(&self, schedule: &Schedule) -> Result<()> {
        self.schedules
            .write()
            .await
            .insert(schedule.id.clone(), schedule.clone());
        Ok(())
    }

    async fn delete_schedule(&self, id: &str) -> Result<()> {
        self.schedules.write().await.remove(id);
        Ok(())
    }

    async fn save_execution(&self, execution: &ScheduleExecution) -> Result<()> {
        self.executions
            .write()
            .await
            .insert(execution.id.clone(), execution.clone());
        Ok(())
    }

    async fn executions(&self, schedule_id: &str, limit: usize) -> Result<Vec<ScheduleExecution>> {
        let mut matching: Vec<ScheduleExecution> = self
            .executions
            .read()
            .await
            .values()
            .filter(|e| e.schedule_id == schedule_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn save_chain(&self, chain: &ScenarioChain) -> Result<()> {
        self.chains
            .write()
            .await
            .insert(chain.id.clone(), chain.clone());
        Ok(())
    }

    async fn chains(&self) -> Result<Vec<ScenarioChain>> {
        Ok(self.chains.read().await.values().cloned().collect())
    }

    async fn chain(&self, id: &str) -> Result<Option<ScenarioChain>> {
        Ok(self.chains.read().await.get(id).cloned())
    }

    async fn update_chain(&self, chain: &ScenarioChain) -> Result<()> {
        self.chains
            .write()
            .await
            .insert(chain.id.clone(), chain.clone());
        Ok(())
    }

    async fn delete_chain(&self, id: &str) -> Result<()> {
        self.chains.write().await.remove(id);
        Ok(())
    }

    async fn save_chain_execution(&self, execution: &ChainExecution) -> Result<()> {
        self.chain_executions
            .write()
            .await
            .insert(execution.id.clone(), execution.clone());
        Ok(())
    }

    async fn chain_executions(
        &self,
        chain_id: &str,
        limit: usize,
    ) -> Result<Vec<ChainExecution>> {
        let mut matching: Vec<ChainExecution> = self
            .chain_executions
            .read()
            .await
            .values()
            .filter(|e| e.chain_id == chain_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn chain_execution(&self, id: &str) -> Result<Option<ChainExecution>> {
        Ok(self.chain_executions.read().await.get(id).cloned())
    }

    async fn update_chain_execution(&self, execution: &ChainExecution) -> Result<()> {
        self.chain_executions
            .write()
            .await
            .insert(execution.id.clone(), execution.clone());
        Ok(())
    }

    async fn running_chain_executions(&self) -> Result<Vec<ChainExecution>> {
        Ok(self
            .chain_executions
            .read()
            .await
            .values()
            .filter(|e| e.status == ChainStatus::Running)
            .cloned()
            .collect())
    }

    async fn save_chain_schedule(&self, schedule: &ChainSchedule) -> Result<()> {
        self.chain_schedules
            .write()
            .await
            .insert(schedule.id.clone(), schedule.clone());
        Ok(())
    }

    async fn chain_schedules(&self) -> Result<Vec<ChainSchedule>> {
        Ok(self.chain_schedules.read().await.values().cloned().collect())
    }

    async fn chain_schedule(&self, id: &str) -> Result<Option<ChainSchedule>> {
        Ok(self.chain_schedules.read().await.get(id).cloned())
    }

    async fn update_chain_schedule(&self, schedule: &ChainSchedule) -> Result<()> {
        self.chain_schedules
            .write()
            .await
            .insert(schedule.id.clone(), schedule.clone());
        Ok(())
    }

    async fn delete_chain_schedule(&self, id: &str) -> Result<()> {
        self.chain_schedules.write().await.remove(id);
        Ok(())
    }
}
