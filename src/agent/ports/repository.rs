//! Repository port for durable agent records.

use crate::agent::domain::{Agent, AgentId, AgentStatus, TaskType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for agent repository operations.
pub type AgentRepositoryResult<T> = Result<T, AgentRepositoryError>;

/// Agent persistence contract.
///
/// Agents are never deleted through this port; removing stale records is a
/// concern of the store itself.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// Inserts the agent, or replaces the stored record with the same
    /// identifier.
    ///
    /// # Errors
    ///
    /// Returns [`AgentRepositoryError::Persistence`] when the write fails.
    async fn upsert(&self, agent: &Agent) -> AgentRepositoryResult<()>;

    /// Finds an agent by identifier.
    ///
    /// Returns `None` when the agent was never registered.
    async fn find_by_id(&self, id: AgentId) -> AgentRepositoryResult<Option<Agent>>;

    /// Sets the liveness status of a stored agent and returns the updated
    /// record.
    ///
    /// # Errors
    ///
    /// Returns [`AgentRepositoryError::NotFound`] when the agent does not
    /// exist.
    async fn set_status(
        &self,
        id: AgentId,
        status: AgentStatus,
        at: DateTime<Utc>,
    ) -> AgentRepositoryResult<Agent>;

    /// Returns every agent serving `task_type`, regardless of status.
    async fn list_by_task_type(&self, task_type: &TaskType) -> AgentRepositoryResult<Vec<Agent>>;

    /// Returns all agents with `Active` status.
    async fn list_active(&self) -> AgentRepositoryResult<Vec<Agent>>;
}

/// Errors returned by agent repository implementations.
#[derive(Debug, Clone, Error)]
pub enum AgentRepositoryError {
    /// The agent was not found.
    #[error("agent not found: {0}")]
    NotFound(AgentId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl AgentRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
