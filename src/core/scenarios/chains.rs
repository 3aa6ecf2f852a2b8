//! User-created scenario chains and their sequential step workers.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::{ScenarioManager, duration_from_config, new_id};
use crate::core::error::EngineError;
use crate::core::models::{
    ChainExecution, ChainExecutionStep, ChainStatus, ChainStepStatus, ScenarioChain,
};

enum ChainOutcome {
    Completed,
    Failed(String),
    /// Stopped or shut down mid-run; whoever interrupted owns the record.
    Interrupted,
}

impl ScenarioManager {
    pub async fn create_chain(
        &self,
        mut chain: ScenarioChain,
    ) -> Result<ScenarioChain, EngineError> {
        if chain.steps.is_empty() {
            return Err(EngineError::InvalidRequest(
                "chain must contain at least one step".to_string(),
            ));
        }
        for (index, step) in chain.steps.iter_mut().enumerate() {
            if step.scenario_type.is_empty() {
                return Err(EngineError::InvalidRequest(format!(
                    "step {} is missing a scenario type",
                    index + 1
                )));
            }
            step.order = index;
        }

        if chain.id.is_empty() {
            chain.id = new_id();
        }
        chain.status = ChainStatus::Pending;
        chain.created_at = Utc::now();
        chain.started_at = None;
        chain.completed_at = None;

        self.storage.save_chain(&chain).await?;

        info!("created chain: {} ({} steps)", chain.name, chain.steps.len());
        Ok(chain)
    }

    pub async fn chains(&self) -> Result<Vec<ScenarioChain>, EngineError> {
        Ok(self.storage.chains().await?)
    }

    pub async fn chain(&self, id: &str) -> Result<Option<ScenarioChain>, EngineError> {
        Ok(self.storage.chain(id).await?)
    }

    /// Refuses while any execution of the chain is still active.
    pub async fn delete_chain(&self, id: &str) -> Result<(), EngineError> {
        {
            let state = self.state.read().await;
            if state.active_chains.values().any(|e| e.chain_id == id) {
                return Err(EngineError::ActiveChainReferenced);
            }
        }
        if self.storage.chain(id).await?.is_none() {
            return Err(EngineError::NotFound("chain", id.to_string()));
        }
        self.storage.delete_chain(id).await?;
        info!("deleted chain: {id}");
        Ok(())
    }

    /// Builds a pending-step execution record, registers it in the active
    /// index, and spawns the step worker. Returns the execution immediately.
    pub async fn start_chain(
        self: &Arc<Self>,
        chain_id: &str,
    ) -> Result<ChainExecution, EngineError> {
        let chain = self
            .storage
            .chain(chain_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("chain", chain_id.to_string()))?;

        let execution = ChainExecution {
            id: new_id(),
            chain_id: chain_id.to_string(),
            status: ChainStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            error: None,
            steps: chain
                .steps
                .iter()
                .enumerate()
                .map(|(index, step)| ChainExecutionStep {
                    step_index: index,
                    scenario_type: step.scenario_type.clone(),
                    status: ChainStepStatus::Pending,
                    started_at: None,
                    completed_at: None,
                    error: None,
                })
                .collect(),
        };

        self.storage.save_chain_execution(&execution).await?;
        {
            let mut state = self.state.write().await;
            state
                .active_chains
                .insert(execution.id.clone(), execution.clone());
        }

        let manager = Arc::clone(self);
        let worker_chain = chain.clone();
        let worker_execution = execution.clone();
        tokio::spawn(async move {
            manager.run_chain(worker_chain, worker_execution).await;
        });

        info!("started chain: {} ({} steps)", chain.name, chain.steps.len());
        Ok(execution)
    }

    /// Marks the execution stopped. The worker observes the missing registry
    /// entry at the next step boundary and bails out.
    pub async fn stop_chain(&self, execution_id: &str) -> Result<(), EngineError> {
        let mut execution = {
            let mut state = self.state.write().await;
            state
                .active_chains
                .remove(execution_id)
                .ok_or_else(|| EngineError::NotFound("chain execution", execution_id.to_string()))?
        };
        execution.status = ChainStatus::Stopped;
        execution.completed_at = Some(Utc::now());

        if let Err(e) = self.storage.update_chain_execution(&execution).await {
            warn!("failed to persist chain execution {execution_id}: {e}");
        }
        info!("stopped chain execution: {execution_id}");
        Ok(())
    }

    pub async fn chain_executions(
        &self,
        chain_id: &str,
        limit: usize,
    ) -> Result<Vec<ChainExecution>, EngineError> {
        Ok(self.storage.chain_executions(chain_id, limit).await?)
    }

    pub async fn active_chain_executions(&self) -> Vec<ChainExecution> {
        let state = self.state.read().await;
        let mut executions: Vec<ChainExecution> = state.active_chains.values().cloned().collect();
        executions.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        executions
    }

    // --- Worker ---

    pub(super) async fn run_chain(
        self: Arc<Self>,
        chain: ScenarioChain,
        mut execution: ChainExecution,
    ) {
        let outcome = self.run_chain_steps(&chain, &mut execution).await;

        match outcome {
            ChainOutcome::Interrupted => return,
            ChainOutcome::Failed(message) => {
                execution.status = ChainStatus::Failed;
                execution.error = Some(message);
            }
            ChainOutcome::Completed => execution.status = ChainStatus::Completed,
        }
        execution.completed_at = Some(Utc::now());

        let removed = {
            let mut state = self.state.write().await;
            state.active_chains.remove(&execution.id)
        };
        if removed.is_none() {
            // A concurrent stop already finalized the record.
            return;
        }

        if let Err(e) = self.storage.update_chain_execution(&execution).await {
            warn!("failed to persist chain execution {}: {e}", execution.id);
        }
        info!("finished chain: {}", chain.name);
    }

    async fn run_chain_steps(
        self: &Arc<Self>,
        chain: &ScenarioChain,
        execution: &mut ChainExecution,
    ) -> ChainOutcome {
        for (index, step) in chain.steps.iter().enumerate() {
            if !self.chain_is_live(&execution.id).await {
                return ChainOutcome::Interrupted;
            }

            execution.steps[index].status = ChainStepStatus::Running;
            execution.steps[index].started_at = Some(Utc::now());
            self.sync_chain_execution(execution).await;

            info!(
                "executing chain step {}/{}: {}",
                index + 1,
                chain.steps.len(),
                step.scenario_type
            );

            if step.delay_before > 0 {
                info!(
                    "delaying step {} by {} seconds",
                    index + 1,
                    step.delay_before
                );
                let delay = std::time::Duration::from_secs(step.delay_before);
                if !self.interruptible_sleep(delay).await {
                    return ChainOutcome::Interrupted;
                }
                if !self.chain_is_live(&execution.id).await {
                    return ChainOutcome::Interrupted;
                }
            }

            if let Err(e) = self
                .start_scenario(&step.scenario_type, step.config.as_ref())
                .await
            {
                warn!("chain step {} failed: {e}", index + 1);
                execution.steps[index].status = ChainStepStatus::Failed;
                execution.steps[index].error = Some(e.to_string());
                return ChainOutcome::Failed(format!("step {} failed: {e}", index + 1));
            }

            // The duration hint gives the dispatched scenario its window
            // before the next step begins; it is not a join on the worker.
            if let Some(wait) = duration_from_config(step.config.as_ref()) {
                info!(
                    "waiting {}s before advancing past step {}",
                    wait.as_secs(),
                    index + 1
                );
                if !self.interruptible_sleep(wait).await {
                    return ChainOutcome::Interrupted;
                }
            }

            execution.steps[index].status = ChainStepStatus::Completed;
            execution.steps[index].completed_at = Some(Utc::now());
            self.sync_chain_execution(execution).await;

            info!(
                "completed chain step {}/{}: {}",
                index + 1,
                chain.steps.len(),
                step.scenario_type
            );
        }

        ChainOutcome::Completed
    }

    async fn chain_is_live(&self, execution_id: &str) -> bool {
        let state = self.state.read().await;
        state
            .active_chains
            .get(execution_id)
            .is_some_and(|e| e.status == ChainStatus::Running)
    }

    /// Mirrors the worker's copy into the active index and the store, unless
    /// the execution was stopped out from under the worker.
    async fn sync_chain_execution(&self, execution: &ChainExecution) {
        let live = {
            let mut state = self.state.write().await;
            match state.active_chains.get_mut(&execution.id) {
                Some(entry) => {
                    *entry = execution.clone();
                    true
                }
                None => false,
            }
        };
        if live {
            if let Err(e) = self.storage.update_chain_execution(execution).await {
                warn!("failed to persist chain execution {}: {e}", execution.id);
            }
        }
    }
}
