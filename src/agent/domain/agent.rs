//! Agent aggregate root.

use super::{AgentCapabilities, AgentId, AgentName, AgentStatus, TaskType};
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Registration data for an agent that has not been seen before.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAgent {
    /// Identifier presented by the agent.
    pub id: AgentId,
    /// Display name shown to callers.
    pub name: AgentName,
    /// Task type the agent serves.
    pub task_type: TaskType,
    /// Declared feature set.
    pub capabilities: AgentCapabilities,
}

/// Agent aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    id: AgentId,
    name: AgentName,
    task_type: TaskType,
    capabilities: AgentCapabilities,
    status: AgentStatus,
    last_heartbeat: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedAgentData {
    /// Persisted agent identifier.
    pub id: AgentId,
    /// Persisted display name.
    pub name: AgentName,
    /// Persisted task-type capability.
    pub task_type: TaskType,
    /// Persisted feature set.
    pub capabilities: AgentCapabilities,
    /// Persisted liveness status.
    pub status: AgentStatus,
    /// Persisted last-heartbeat timestamp.
    pub last_heartbeat: DateTime<Utc>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest lifecycle timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    /// Creates a newly registered agent with `Active` status and a fresh
    /// heartbeat.
    #[must_use]
    pub fn new(registration: NewAgent, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: registration.id,
            name: registration.name,
            task_type: registration.task_type,
            capabilities: registration.capabilities,
            status: AgentStatus::Active,
            last_heartbeat: timestamp,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs an agent from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedAgentData) -> Self {
        Self {
            id: data.id,
            name: data.name,
            task_type: data.task_type,
            capabilities: data.capabilities,
            status: data.status,
            last_heartbeat: data.last_heartbeat,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the agent identifier.
    #[must_use]
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub const fn name(&self) -> &AgentName {
        &self.name
    }

    /// Returns the task type this agent serves.
    #[must_use]
    pub const fn task_type(&self) -> &TaskType {
        &self.task_type
    }

    /// Returns the declared feature set.
    #[must_use]
    pub const fn capabilities(&self) -> &AgentCapabilities {
        &self.capabilities
    }

    /// Returns the liveness status.
    #[must_use]
    pub const fn status(&self) -> AgentStatus {
        self.status
    }

    /// Returns the time of the most recent heartbeat or registration.
    #[must_use]
    pub const fn last_heartbeat(&self) -> DateTime<Utc> {
        self.last_heartbeat
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest lifecycle timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Applies a repeated registration: replaces the descriptive fields,
    /// reactivates the agent and refreshes its heartbeat. The creation
    /// timestamp is kept.
    pub fn reregister(&mut self, registration: NewAgent, clock: &impl Clock) {
        let NewAgent {
            id: _,
            name,
            task_type,
            capabilities,
        } = registration;
        let timestamp = clock.utc();
        self.name = name;
        self.task_type = task_type;
        self.capabilities = capabilities;
        self.status = AgentStatus::Active;
        self.last_heartbeat = timestamp;
        self.updated_at = timestamp;
    }

    /// Records a heartbeat carrying the agent's self-reported status.
    pub fn record_heartbeat(&mut self, status: AgentStatus, clock: &impl Clock) {
        let timestamp = clock.utc();
        self.status = status;
        self.last_heartbeat = timestamp;
        self.updated_at = timestamp;
    }

    /// Deactivates the agent, setting status to [`AgentStatus::Inactive`].
    pub fn deactivate(&mut self, clock: &impl Clock) {
        self.apply_status(AgentStatus::Inactive, clock.utc());
    }

    /// Applies a status change observed at `at` without touching the
    /// heartbeat timestamp.
    pub const fn apply_status(&mut self, status: AgentStatus, at: DateTime<Utc>) {
        self.status = status;
        self.updated_at = at;
    }

    /// Returns whether the last heartbeat is at least `timeout` old at `now`.
    #[must_use]
    pub fn heartbeat_expired(&self, now: DateTime<Utc>, timeout: TimeDelta) -> bool {
        now.signed_duration_since(self.last_heartbeat) >= timeout
    }

    /// Returns whether the agent may receive new work at `now`: it must be
    /// active and its last heartbeat must be younger than `timeout`.
    #[must_use]
    pub fn is_eligible(&self, now: DateTime<Utc>, timeout: TimeDelta) -> bool {
        self.status.is_active() && !self.heartbeat_expired(now, timeout)
    }
}
