//! Service layer for agent registration, heartbeats and eligibility.
//!
//! Provides [`AgentDirectory`] which coordinates registration upserts,
//! heartbeat bookkeeping, disconnect deactivation, the liveness sweep, and
//! least-recently-assigned selection among eligible agents.
//!
//! Every read-modify-write of an agent record runs under one async write
//! lock, so a heartbeat can never be overwritten by a sweep that read the
//! record before it, and a disconnect can never deactivate an agent that a
//! newer session has just registered.

use crate::agent::{
    domain::{Agent, AgentCapabilities, AgentId, AgentName, AgentStatus, NewAgent, TaskType},
    ports::{AgentRepository, AgentRepositoryError},
    services::LivenessPolicy,
};
use mockable::Clock;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tracing::warn;

/// Request payload for registering (or re-registering) an agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterAgentRequest {
    agent_id: AgentId,
    name: AgentName,
    task_type: TaskType,
    capabilities: AgentCapabilities,
}

impl RegisterAgentRequest {
    /// Creates a request with the required registration fields.
    #[must_use]
    pub fn new(agent_id: AgentId, name: AgentName, task_type: TaskType) -> Self {
        Self {
            agent_id,
            name,
            task_type,
            capabilities: AgentCapabilities::default(),
        }
    }

    /// Sets the declared feature set.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: AgentCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

/// Service-level errors for agent directory operations.
#[derive(Debug, Error)]
pub enum AgentDirectoryError {
    /// The agent has never registered.
    #[error("unknown agent: {0}")]
    UnknownAgent(AgentId),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(AgentRepositoryError),
}

impl From<AgentRepositoryError> for AgentDirectoryError {
    fn from(err: AgentRepositoryError) -> Self {
        match err {
            AgentRepositoryError::NotFound(id) => Self::UnknownAgent(id),
            other @ AgentRepositoryError::Persistence(_) => Self::Repository(other),
        }
    }
}

/// Result type for agent directory operations.
pub type AgentDirectoryResult<T> = Result<T, AgentDirectoryError>;

/// Assignment order used to spread work across equally eligible agents.
#[derive(Debug, Default)]
struct Rotation {
    sequence: u64,
    last_assigned: HashMap<AgentId, u64>,
}

impl Rotation {
    /// Picks the least recently assigned candidate, ties broken by the lower
    /// agent identifier, and stamps it as the newest assignment.
    fn select(&mut self, candidates: Vec<Agent>) -> Option<Agent> {
        let chosen = candidates.into_iter().min_by_key(|agent| {
            let stamp = self.last_assigned.get(&agent.id()).copied().unwrap_or(0);
            (stamp, agent.id())
        })?;
        self.sequence = self.sequence.saturating_add(1);
        self.last_assigned.insert(chosen.id(), self.sequence);
        Some(chosen)
    }
}

/// Agent registration, liveness and selection service.
pub struct AgentDirectory<R, C>
where
    R: AgentRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    policy: LivenessPolicy,
    rotation: Mutex<Rotation>,
    writes: AsyncMutex<()>,
}

impl<R, C> AgentDirectory<R, C>
where
    R: AgentRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new agent directory.
    #[must_use]
    pub fn new(repository: Arc<R>, clock: Arc<C>, policy: LivenessPolicy) -> Self {
        Self {
            repository,
            clock,
            policy,
            rotation: Mutex::new(Rotation::default()),
            writes: AsyncMutex::new(()),
        }
    }

    /// Returns the liveness policy in force.
    #[must_use]
    pub const fn policy(&self) -> LivenessPolicy {
        self.policy
    }

    /// Registers an agent, or refreshes an existing record with the same
    /// identifier. Either way the agent ends up `Active` with a fresh
    /// heartbeat.
    ///
    /// # Errors
    ///
    /// Returns [`AgentDirectoryError::Repository`] when persistence fails.
    pub async fn register(&self, request: RegisterAgentRequest) -> AgentDirectoryResult<Agent> {
        let (agent, ()) = self
            .register_with(request, |_| Ok::<_, AgentDirectoryError>(()))
            .await?;
        Ok(agent)
    }

    /// Registers an agent and runs `attach` while the write lock is still
    /// held, so nothing else can touch the record between the two.
    ///
    /// When `attach` fails the stored record is rolled back: a previous
    /// registration is restored as it was, and a first registration is left
    /// `Inactive`.
    ///
    /// # Errors
    ///
    /// Returns the error from `attach`, or a repository failure converted
    /// into `E`.
    pub async fn register_with<T, E, F>(
        &self,
        request: RegisterAgentRequest,
        attach: F,
    ) -> Result<(Agent, T), E>
    where
        F: FnOnce(&Agent) -> Result<T, E> + Send,
        E: From<AgentDirectoryError> + Send,
    {
        let RegisterAgentRequest {
            agent_id,
            name,
            task_type,
            capabilities,
        } = request;
        let registration = NewAgent {
            id: agent_id,
            name,
            task_type,
            capabilities,
        };

        let _writes = self.writes.lock().await;
        let previous = self
            .repository
            .find_by_id(agent_id)
            .await
            .map_err(AgentDirectoryError::from)?;
        let agent = match previous.clone() {
            Some(mut existing) => {
                existing.reregister(registration, &*self.clock);
                existing
            }
            None => Agent::new(registration, &*self.clock),
        };
        self.repository
            .upsert(&agent)
            .await
            .map_err(AgentDirectoryError::from)?;

        match attach(&agent) {
            Ok(attached) => Ok((agent, attached)),
            Err(err) => {
                self.roll_back_registration(agent_id, previous).await;
                Err(err)
            }
        }
    }

    /// Records a heartbeat and the agent's self-reported status.
    ///
    /// # Errors
    ///
    /// Returns [`AgentDirectoryError::UnknownAgent`] when the agent never
    /// registered, or [`AgentDirectoryError::Repository`] when persistence
    /// fails.
    pub async fn heartbeat(
        &self,
        agent_id: AgentId,
        status: AgentStatus,
    ) -> AgentDirectoryResult<Agent> {
        let _writes = self.writes.lock().await;
        let mut agent = self.find_by_id_or_error(agent_id).await?;
        agent.record_heartbeat(status, &*self.clock);
        self.repository.upsert(&agent).await?;
        Ok(agent)
    }

    /// Marks an agent inactive after its session closed.
    ///
    /// # Errors
    ///
    /// Returns [`AgentDirectoryError::UnknownAgent`] when the agent never
    /// registered, or [`AgentDirectoryError::Repository`] when persistence
    /// fails.
    pub async fn mark_inactive(&self, agent_id: AgentId) -> AgentDirectoryResult<Agent> {
        let _writes = self.writes.lock().await;
        self.deactivate(agent_id).await
    }

    /// Marks an agent inactive unless `still_bound` reports, under the write
    /// lock, that another session holds the agent identity again.
    ///
    /// Returns `None` when the deactivation was skipped.
    ///
    /// # Errors
    ///
    /// Returns [`AgentDirectoryError::UnknownAgent`] when the agent never
    /// registered, or [`AgentDirectoryError::Repository`] when persistence
    /// fails.
    pub async fn mark_inactive_unless<F>(
        &self,
        agent_id: AgentId,
        still_bound: F,
    ) -> AgentDirectoryResult<Option<Agent>>
    where
        F: FnOnce() -> bool + Send,
    {
        let _writes = self.writes.lock().await;
        if still_bound() {
            return Ok(None);
        }
        self.deactivate(agent_id).await.map(Some)
    }

    /// Finds an agent by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`AgentDirectoryError::Repository`] when lookup fails.
    pub async fn find_by_id(&self, agent_id: AgentId) -> AgentDirectoryResult<Option<Agent>> {
        Ok(self.repository.find_by_id(agent_id).await?)
    }

    /// Returns whether the agent is currently eligible for new work.
    ///
    /// Unknown agents are never eligible.
    ///
    /// # Errors
    ///
    /// Returns [`AgentDirectoryError::Repository`] when lookup fails.
    pub async fn is_eligible(&self, agent_id: AgentId) -> AgentDirectoryResult<bool> {
        let now = self.clock.utc();
        Ok(self
            .repository
            .find_by_id(agent_id)
            .await?
            .is_some_and(|agent| agent.is_eligible(now, self.policy.heartbeat_timeout())))
    }

    /// Selects one eligible agent serving `task_type`.
    ///
    /// Among several eligible agents the least recently assigned one wins,
    /// with the lower agent identifier breaking ties. The selection itself
    /// counts as an assignment for rotation purposes.
    ///
    /// # Errors
    ///
    /// Returns [`AgentDirectoryError::Repository`] when lookup fails.
    pub async fn find_eligible(&self, task_type: &TaskType) -> AgentDirectoryResult<Option<Agent>> {
        self.find_eligible_where(task_type, |_| true).await
    }

    /// Like [`Self::find_eligible`], additionally requiring `accept` to hold
    /// for the selected agent.
    ///
    /// # Errors
    ///
    /// Returns [`AgentDirectoryError::Repository`] when lookup fails.
    pub async fn find_eligible_where<F>(
        &self,
        task_type: &TaskType,
        accept: F,
    ) -> AgentDirectoryResult<Option<Agent>>
    where
        F: Fn(&Agent) -> bool + Send,
    {
        let agents = self.repository.list_by_task_type(task_type).await?;
        let now = self.clock.utc();
        let timeout = self.policy.heartbeat_timeout();
        let candidates: Vec<Agent> = agents
            .into_iter()
            .filter(|agent| agent.is_eligible(now, timeout) && accept(agent))
            .collect();
        Ok(self.rotation.lock().select(candidates))
    }

    /// Deactivates every active agent whose heartbeat has expired and
    /// returns the agents that were flipped.
    ///
    /// Tasks already assigned to those agents are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`AgentDirectoryError::Repository`] when lookup fails. A
    /// failure to deactivate one agent is skipped so the rest of the sweep
    /// still runs.
    pub async fn sweep_expired(&self) -> AgentDirectoryResult<Vec<Agent>> {
        let _writes = self.writes.lock().await;
        let now = self.clock.utc();
        let timeout = self.policy.heartbeat_timeout();
        let expired: Vec<AgentId> = self
            .repository
            .list_active()
            .await?
            .into_iter()
            .filter(|agent| agent.heartbeat_expired(now, timeout))
            .map(|agent| agent.id())
            .collect();

        let mut deactivated = Vec::with_capacity(expired.len());
        for agent_id in expired {
            match self
                .repository
                .set_status(agent_id, AgentStatus::Inactive, now)
                .await
            {
                Ok(agent) => deactivated.push(agent),
                Err(err) => {
                    warn!(%agent_id, error = %err, "failed to deactivate expired agent");
                }
            }
        }
        Ok(deactivated)
    }

    async fn deactivate(&self, agent_id: AgentId) -> AgentDirectoryResult<Agent> {
        Ok(self
            .repository
            .set_status(agent_id, AgentStatus::Inactive, self.clock.utc())
            .await?)
    }

    async fn roll_back_registration(&self, agent_id: AgentId, previous: Option<Agent>) {
        let rolled_back = match previous {
            Some(previous) => self.repository.upsert(&previous).await,
            None => self
                .repository
                .set_status(agent_id, AgentStatus::Inactive, self.clock.utc())
                .await
                .map(drop),
        };
        if let Err(err) = rolled_back {
            warn!(%agent_id, error = %err, "failed to roll back agent registration");
        }
    }

    async fn find_by_id_or_error(&self, agent_id: AgentId) -> AgentDirectoryResult<Agent> {
        self.repository
            .find_by_id(agent_id)
            .await?
            .ok_or(AgentDirectoryError::UnknownAgent(agent_id))
    }
}
