//! I/O-free dispatch engine.
//!
//! Each handler takes one inbound event for a session and returns the
//! deliveries it produces. Failures are isolated to the originating session
//! as an `error` event; shared state is only mutated once a handler's
//! preconditions hold.

use super::error::{DispatchError, DispatchResult, ValidationError};
use super::events::{
    AGENT_DISCONNECTED, AgentAvailable, AgentRegistered, AgentUnavailable, Connected, Delivery,
    HeartbeatAck, HeartbeatRequest, NO_ELIGIBLE_AGENT, OutboundEvent, TaskAccepted, TaskAssigned,
    TaskCompleted, TaskRejected,
};
use super::messages::{Heartbeat, InboundMessage, RegisterAgent, TaskRequest, TaskResult};
use crate::agent::{
    ports::AgentRepository,
    services::{AgentDirectory, RegisterAgentRequest},
};
use crate::matchmaker::TaskMatchmaker;
use crate::session::{
    domain::{Identity, SessionId},
    services::{ConnectionRegistry, Outbox},
};
use crate::task::{
    ports::TaskRepository,
    services::{CreateTaskRequest, TaskLifecycleError, TaskLifecycleService},
};
use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Greeting sent in `connected` events.
const GREETING: &str = "Connected to dispatch hub";

/// Protocol state machine shared by every connection.
pub struct DispatchEngine<A, T, C>
where
    A: AgentRepository,
    T: TaskRepository,
    C: Clock + Send + Sync,
{
    registry: Arc<ConnectionRegistry>,
    directory: Arc<AgentDirectory<A, C>>,
    matchmaker: TaskMatchmaker<A, C>,
    tasks: TaskLifecycleService<T, C>,
    clock: Arc<C>,
}

impl<A, T, C> DispatchEngine<A, T, C>
where
    A: AgentRepository,
    T: TaskRepository,
    C: Clock + Send + Sync,
{
    /// Creates an engine over the shared registry, directory and task store.
    #[must_use]
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        directory: Arc<AgentDirectory<A, C>>,
        tasks: TaskLifecycleService<T, C>,
        clock: Arc<C>,
    ) -> Self {
        let matchmaker = TaskMatchmaker::new(Arc::clone(&directory), Arc::clone(&registry));
        Self {
            registry,
            directory,
            matchmaker,
            tasks,
            clock,
        }
    }

    /// Returns the connection registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Returns the agent directory.
    #[must_use]
    pub const fn directory(&self) -> &Arc<AgentDirectory<A, C>> {
        &self.directory
    }

    /// Returns the task lifecycle service.
    #[must_use]
    pub const fn tasks(&self) -> &TaskLifecycleService<T, C> {
        &self.tasks
    }

    /// Opens a session and greets it.
    pub fn connect(&self, session_id: SessionId, outbox: Outbox) -> Vec<Delivery> {
        let session = self
            .registry
            .connect(session_id, self.clock.utc(), outbox);
        info!(%session_id, "session connected");
        vec![Delivery::to_session(
            session_id,
            OutboundEvent::Connected(Connected {
                session_id,
                message: GREETING.to_owned(),
                timestamp: session.connected_at(),
            }),
        )]
    }

    /// Decodes and handles a text frame.
    pub async fn handle_frame(&self, session_id: SessionId, frame: &str) -> Vec<Delivery> {
        match InboundMessage::decode(frame) {
            Ok(message) => self.handle(session_id, message).await,
            Err(err) => self.reject(session_id, err),
        }
    }

    /// Reports a frame the transport could not hand over as text.
    pub fn reject(&self, session_id: SessionId, err: ValidationError) -> Vec<Delivery> {
        warn!(%session_id, error = %err, "rejected inbound frame");
        vec![Delivery::to_session(
            session_id,
            DispatchError::from(err).into(),
        )]
    }

    /// Handles a decoded message.
    pub async fn handle(&self, session_id: SessionId, message: InboundMessage) -> Vec<Delivery> {
        let kind = message.kind();
        let outcome = match message {
            InboundMessage::Register(payload) => self.register(session_id, payload).await,
            InboundMessage::Heartbeat(payload) => self.heartbeat(session_id, payload).await,
            InboundMessage::TaskRequest(payload) => self.request_task(session_id, payload).await,
            InboundMessage::TaskResult(payload) => self.complete_task(session_id, payload).await,
        };
        outcome.unwrap_or_else(|err| {
            match &err {
                DispatchError::Internal(_) => {
                    error!(%session_id, kind, error = %err, "message handling failed");
                }
                _ => warn!(%session_id, kind, error = %err, "message rejected"),
            }
            vec![Delivery::to_session(session_id, err.into())]
        })
    }

    /// Closes a session.
    ///
    /// An agent whose current session closes is marked inactive and
    /// announced as unavailable. A session that had since been replaced by a
    /// newer connection for the same agent leaves the agent untouched, as
    /// does a close that races a re-registration from another session.
    pub async fn disconnect(&self, session_id: SessionId) -> Vec<Delivery> {
        let Some(unbound) = self.registry.unbind(session_id) else {
            debug!(%session_id, "unassigned session closed");
            return Vec::new();
        };
        match unbound.identity {
            Identity::Agent(agent_id) if unbound.current => {
                let registry = &self.registry;
                let deactivated = self
                    .directory
                    .mark_inactive_unless(agent_id, || {
                        registry.is_connected(Identity::Agent(agent_id))
                    })
                    .await;
                match deactivated {
                    Ok(Some(_)) => {}
                    Ok(None) => {
                        debug!(%session_id, %agent_id, "agent re-registered before its old session closed");
                        return Vec::new();
                    }
                    Err(err) => {
                        warn!(%session_id, %agent_id, error = %err, "failed to deactivate agent");
                    }
                }
                info!(%session_id, %agent_id, "agent disconnected");
                vec![Delivery::to_callers(OutboundEvent::AgentUnavailable(
                    AgentUnavailable { agent_id },
                ))]
            }
            Identity::Agent(agent_id) => {
                debug!(%session_id, %agent_id, "superseded agent session closed");
                Vec::new()
            }
            Identity::Caller(caller_id) => {
                debug!(%session_id, %caller_id, "caller disconnected");
                Vec::new()
            }
        }
    }

    /// Runs one liveness pass.
    ///
    /// Agents whose heartbeat expired are marked inactive and announced as
    /// unavailable; every agent session is then sent a
    /// `heartbeat_request`.
    pub async fn sweep(&self) -> Vec<Delivery> {
        let mut deliveries = match self.directory.sweep_expired().await {
            Ok(expired) => expired
                .iter()
                .map(|agent| {
                    info!(agent_id = %agent.id(), "agent heartbeat expired");
                    Delivery::to_callers(OutboundEvent::AgentUnavailable(AgentUnavailable {
                        agent_id: agent.id(),
                    }))
                })
                .collect(),
            Err(err) => {
                error!(error = %err, "liveness sweep failed");
                Vec::new()
            }
        };
        deliveries.push(Delivery::to_agents(
            None,
            OutboundEvent::HeartbeatRequest(HeartbeatRequest {
                timestamp: self.clock.utc(),
            }),
        ));
        deliveries
    }

    async fn register(
        &self,
        session_id: SessionId,
        payload: RegisterAgent,
    ) -> DispatchResult<Vec<Delivery>> {
        self.registry
            .ensure_bindable(session_id, Identity::Agent(payload.agent_id))?;

        let request = RegisterAgentRequest::new(payload.agent_id, payload.name, payload.task_type)
            .with_capabilities(payload.capabilities.unwrap_or_default());
        let registry = &self.registry;
        let (agent, outcome) = self
            .directory
            .register_with(request, |agent| {
                registry
                    .bind_agent(session_id, agent.id(), agent.task_type().clone())
                    .map_err(DispatchError::from)
            })
            .await?;
        if let Some(displaced) = outcome.displaced {
            info!(%session_id, %displaced, agent_id = %agent.id(), "agent reconnected from a new session");
        }
        info!(%session_id, agent_id = %agent.id(), task_type = %agent.task_type(), "agent registered");

        Ok(vec![
            Delivery::to_session(
                session_id,
                OutboundEvent::AgentRegistered(AgentRegistered {
                    agent_id: agent.id(),
                    status: "registered",
                }),
            ),
            Delivery::to_callers(OutboundEvent::AgentAvailable(AgentAvailable::from(&agent))),
        ])
    }

    async fn heartbeat(
        &self,
        session_id: SessionId,
        payload: Heartbeat,
    ) -> DispatchResult<Vec<Delivery>> {
        let agent = self
            .directory
            .heartbeat(payload.agent_id, payload.status)
            .await?;
        debug!(%session_id, agent_id = %agent.id(), status = %agent.status(), "heartbeat recorded");
        Ok(vec![Delivery::to_session(
            session_id,
            OutboundEvent::HeartbeatAck(HeartbeatAck {
                agent_id: agent.id(),
                status: agent.status(),
                timestamp: agent.last_heartbeat(),
            }),
        )])
    }

    async fn request_task(
        &self,
        session_id: SessionId,
        payload: TaskRequest,
    ) -> DispatchResult<Vec<Delivery>> {
        let TaskRequest {
            caller_id,
            task_type,
            input,
        } = payload;
        self.registry
            .bind(session_id, Identity::Caller(caller_id))?;

        let Some(agent) = self.matchmaker.match_agent(&task_type).await? else {
            info!(%session_id, %caller_id, %task_type, "task rejected: no eligible agent");
            return Ok(vec![Delivery::to_session(
                session_id,
                OutboundEvent::TaskRejected(TaskRejected {
                    task_id: None,
                    task_type,
                    reason: NO_ELIGIBLE_AGENT.to_owned(),
                }),
            )]);
        };

        let task = self
            .tasks
            .create(CreateTaskRequest::new(
                caller_id,
                agent.id(),
                task_type.clone(),
                input,
            ))
            .await?;

        let Some(agent_session) = self.registry.lookup(Identity::Agent(agent.id())) else {
            warn!(task_id = %task.id(), agent_id = %agent.id(), "matched agent disconnected before assignment");
            if let Err(err) = self.tasks.fail(task.id(), AGENT_DISCONNECTED).await {
                error!(task_id = %task.id(), error = %err, "failed to record undeliverable task");
            }
            return Ok(vec![Delivery::to_session(
                session_id,
                OutboundEvent::TaskRejected(TaskRejected {
                    task_id: Some(task.id()),
                    task_type,
                    reason: AGENT_DISCONNECTED.to_owned(),
                }),
            )]);
        };

        info!(
            %session_id,
            task_id = %task.id(),
            agent_id = %agent.id(),
            %task_type,
            "task assigned"
        );
        Ok(vec![
            Delivery::to_session(
                agent_session,
                OutboundEvent::TaskAssigned(TaskAssigned::from(&task)),
            ),
            Delivery::to_session(
                session_id,
                OutboundEvent::TaskAccepted(TaskAccepted {
                    task_id: task.id(),
                    agent_id: agent.id(),
                    agent_name: agent.name().clone(),
                }),
            ),
        ])
    }

    async fn complete_task(
        &self,
        session_id: SessionId,
        payload: TaskResult,
    ) -> DispatchResult<Vec<Delivery>> {
        let task_id = payload.task_id;
        match self.tasks.complete(task_id, payload.into_completion()).await {
            Ok(task) => {
                info!(%session_id, %task_id, status = %task.status(), "task finished");
                Ok(vec![Delivery::to_identity(
                    Identity::Caller(task.caller_id()),
                    OutboundEvent::TaskCompleted(TaskCompleted::from(&task)),
                )])
            }
            Err(TaskLifecycleError::DuplicateCompletion(existing)) => {
                warn!(
                    %session_id,
                    %task_id,
                    status = %existing.status(),
                    "duplicate task result suppressed"
                );
                Ok(Vec::new())
            }
            Err(err) => Err(err.into()),
        }
    }
}
