//! Key-addressed persistence of orchestration entities. Pure CRUD; the
//! engines own business logic and treat the store as a mirror of their
//! in-memory state.

mod memory;

pub use memory::MemoryStorage;

use anyhow::Result;
use async_trait::async_trait;

use super::models::{
    ChainExecution, ChainSchedule, Scenario, ScenarioChain, Schedule, ScheduleExecution,
};

#[async_trait]
pub trait Storage: Send + Sync {
    async fn save_scenario(&self, scenario: &Scenario) -> Result<()>;
    async fn active_scenarios(&self) -> Result<Vec<Scenario>>;
    async fn update_scenario(&self, scenario: &Scenario) -> Result<()>;
    async fn delete_scenario(&self, kind: &str) -> Result<()>;

    async fn save_schedule(&self, schedule: &Schedule) -> Result<()>;
    async fn schedules(&self) -> Result<Vec<Schedule>>;
    async fn schedule(&self, id: &str) -> Result<Option<Schedule>>;
    async fn update_schedule(&self, schedule: &Schedule) -> Result<()>;
    async fn delete_schedule(&self, id: &str) -> Result<()>;

    async fn save_execution(&self, execution: &ScheduleExecution) -> Result<()>;
    async fn executions(&self, schedule_id: &str, limit: usize) -> Result<Vec<ScheduleExecution>>;

    async fn save_chain(&self, chain: &ScenarioChain) -> Result<()>;
    async fn chains(&self) -> Result<Vec<ScenarioChain>>;
    async fn chain(&self, id: &str) -> Result<Option<ScenarioChain>>;
    async fn update_chain(&self, chain: &ScenarioChain) -> Result<()>;
    async fn delete_chain(&self, id: &str) -> Result<()>;

    async fn save_chain_execution(&self, execution: &ChainExecution) -> Result<()>;
    async fn chain_executions(&self, chain_id: &str, limit: usize)
        -> Result<Vec<ChainExecution>>;
    async fn chain_execution(&self, id: &str) -> Result<Option<ChainExecution>>;
    async fn update_chain_execution(&self, execution: &ChainExecution) -> Result<()>;
    async fn running_chain_executions(&self) -> Result<Vec<ChainExecution>>;

    async fn save_chain_schedule(&self, schedule: &ChainSchedule) -> Result<()>;
    async fn chain_schedules(&self) -> Result<Vec<ChainSchedule>>;
    async fn chain_schedule(&self, id: &str) -> Result<Option<ChainSchedule>>;
    async fn update_chain_schedule(&self, schedule: &ChainSchedule) -> Result<()>;
    async fn delete_chain_schedule(&self, id: &str) -> Result<()>;
}
