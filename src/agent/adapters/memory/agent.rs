//! In-memory repository for agent records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::agent::{
    domain::{Agent, AgentId, AgentStatus, TaskType},
    ports::{AgentRepository, AgentRepositoryError, AgentRepositoryResult},
};

/// Thread-safe in-memory agent repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAgentRepository {
    state: Arc<RwLock<InMemoryAgentState>>,
}

#[derive(Debug, Default)]
struct InMemoryAgentState {
    agents: HashMap<AgentId, Agent>,
}

impl InMemoryAgentRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(err: impl std::fmt::Display) -> AgentRepositoryError {
    AgentRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl AgentRepository for InMemoryAgentRepository {
    async fn upsert(&self, agent: &Agent) -> AgentRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.agents.insert(agent.id(), agent.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: AgentId) -> AgentRepositoryResult<Option<Agent>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.agents.get(&id).cloned())
    }

    async fn set_status(
        &self,
        id: AgentId,
        status: AgentStatus,
        at: DateTime<Utc>,
    ) -> AgentRepositoryResult<Agent> {
        let mut state = self.state.write().map_err(poisoned)?;
        let agent = state
            .agents
            .get_mut(&id)
            .ok_or(AgentRepositoryError::NotFound(id))?;
        agent.apply_status(status, at);
        Ok(agent.clone())
    }

    async fn list_by_task_type(&self, task_type: &TaskType) -> AgentRepositoryResult<Vec<Agent>> {
        let state = self.state.read().map_err(poisoned)?;
        let matching = state
            .agents
            .values()
            .filter(|agent| agent.task_type() == task_type)
            .cloned()
            .collect();
        Ok(matching)
    }

    async fn list_active(&self) -> AgentRepositoryResult<Vec<Agent>> {
        let state = self.state.read().map_err(poisoned)?;
        let active = state
            .agents
            .values()
            .filter(|agent| agent.status().is_active())
            .cloned()
            .collect();
        Ok(active)
    }
}
