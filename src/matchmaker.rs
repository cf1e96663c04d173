//! Dispatch policy for choosing an agent to serve a request.
//!
//! The matchmaker delegates eligibility and ordering to the
//! [`AgentDirectory`] and adds one constraint of its own: the chosen agent
//! must hold a live session in the [`ConnectionRegistry`], since an assignment
//! can only be delivered over a connection. Agents are not locked to a single
//! task; two concurrent requests may be matched to the same agent.

use crate::agent::{
    domain::{Agent, TaskType},
    ports::AgentRepository,
    services::{AgentDirectory, AgentDirectoryResult},
};
use crate::session::{domain::Identity, services::ConnectionRegistry};
use mockable::Clock;
use std::sync::Arc;
use tracing::debug;

/// Selects eligible, connected agents for incoming requests.
pub struct TaskMatchmaker<R, C>
where
    R: AgentRepository,
    C: Clock + Send + Sync,
{
    directory: Arc<AgentDirectory<R, C>>,
    registry: Arc<ConnectionRegistry>,
}

impl<R, C> TaskMatchmaker<R, C>
where
    R: AgentRepository,
    C: Clock + Send + Sync,
{
    /// Creates a matchmaker over the shared directory and registry.
    #[must_use]
    pub const fn new(directory: Arc<AgentDirectory<R, C>>, registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            directory,
            registry,
        }
    }

    /// Returns an agent to serve `task_type`, or `None` when no eligible
    /// agent is connected.
    ///
    /// # Errors
    ///
    /// Returns the directory error when the agent store cannot be read.
    pub async fn match_agent(&self, task_type: &TaskType) -> AgentDirectoryResult<Option<Agent>> {
        let registry = &self.registry;
        let matched = self
            .directory
            .find_eligible_where(task_type, |agent| {
                registry.is_connected(Identity::Agent(agent.id()))
            })
            .await?;
        if matched.is_none() {
            debug!(%task_type, "no eligible agent connected");
        }
        Ok(matched)
    }
}
