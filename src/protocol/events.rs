//! Outbound wire events and their delivery targets.

use super::error::{DispatchError, ErrorCode};
use crate::agent::domain::{Agent, AgentCapabilities, AgentId, AgentName, AgentStatus, TaskType};
use crate::session::domain::{Identity, SessionId};
use crate::task::domain::{CallerId, Task, TaskId, TaskPayload, TaskStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Reason sent with `task_rejected` when no agent can take the work.
pub const NO_ELIGIBLE_AGENT: &str = "No available agent for this task type";

/// Error recorded on a task whose agent vanished before the assignment was
/// sent.
pub const AGENT_DISCONNECTED: &str = "agent disconnected before assignment";

/// Payload of `connected`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connected {
    /// Identifier assigned to the new session.
    pub session_id: SessionId,
    /// Greeting text.
    pub message: String,
    /// Connection time.
    pub timestamp: DateTime<Utc>,
}

/// Payload of `agent_registered`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentRegistered {
    /// Registered agent.
    pub agent_id: AgentId,
    /// Always `"registered"`.
    pub status: &'static str,
}

/// Payload of `agent_available`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentAvailable {
    /// Agent that came online.
    pub agent_id: AgentId,
    /// Display name.
    pub name: AgentName,
    /// Task type served.
    pub task_type: TaskType,
    /// Declared feature set.
    pub capabilities: AgentCapabilities,
}

impl From<&Agent> for AgentAvailable {
    fn from(agent: &Agent) -> Self {
        Self {
            agent_id: agent.id(),
            name: agent.name().clone(),
            task_type: agent.task_type().clone(),
            capabilities: agent.capabilities().clone(),
        }
    }
}

/// Payload of `agent_unavailable`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentUnavailable {
    /// Agent that went offline or expired.
    pub agent_id: AgentId,
}

/// Payload of `heartbeat_ack`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeartbeatAck {
    /// Agent whose heartbeat was recorded.
    pub agent_id: AgentId,
    /// Status now on record.
    pub status: AgentStatus,
    /// Recorded heartbeat time.
    pub timestamp: DateTime<Utc>,
}

/// Payload of `heartbeat_request`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeartbeatRequest {
    /// Time the request was issued.
    pub timestamp: DateTime<Utc>,
}

/// Payload of `task_assigned`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskAssigned {
    /// Task to perform.
    pub task_id: TaskId,
    /// Task type requested.
    pub task_type: TaskType,
    /// Caller input, byte-identical to the request.
    pub input: TaskPayload,
    /// Caller that requested the work.
    pub caller_id: CallerId,
}

impl From<&Task> for TaskAssigned {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id(),
            task_type: task.task_type().clone(),
            input: task.input().clone(),
            caller_id: task.caller_id(),
        }
    }
}

/// Payload of `task_accepted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskAccepted {
    /// Task created for the request.
    pub task_id: TaskId,
    /// Agent the task was assigned to.
    pub agent_id: AgentId,
    /// Display name of that agent.
    pub agent_name: AgentName,
}

/// Payload of `task_rejected`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRejected {
    /// Task that was created and then failed, if one was created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    /// Task type requested.
    pub task_type: TaskType,
    /// Human-readable reason.
    pub reason: String,
}

/// Payload of `task_completed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskCompleted {
    /// Finished task.
    pub task_id: TaskId,
    /// Terminal status.
    pub status: TaskStatus,
    /// Agent output, if any.
    pub output: Option<TaskPayload>,
    /// Error detail, if any.
    pub error: Option<String>,
    /// Completion time.
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Task> for TaskCompleted {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id(),
            status: task.status(),
            output: task.output().cloned(),
            error: task.error().map(str::to_owned),
            completed_at: task.completed_at(),
        }
    }
}

/// Payload of `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEvent {
    /// Stable error code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
}

impl From<&DispatchError> for ErrorEvent {
    fn from(err: &DispatchError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Closed set of events the hub sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// Greeting sent when a session opens.
    Connected(Connected),
    /// Registration acknowledgement to the agent.
    AgentRegistered(AgentRegistered),
    /// Broadcast to callers when an agent registers.
    AgentAvailable(AgentAvailable),
    /// Broadcast to callers when an agent disconnects or expires.
    AgentUnavailable(AgentUnavailable),
    /// Heartbeat acknowledgement to the agent.
    HeartbeatAck(HeartbeatAck),
    /// Liveness check broadcast to agents.
    HeartbeatRequest(HeartbeatRequest),
    /// Work handed to an agent.
    TaskAssigned(TaskAssigned),
    /// Confirmation to the caller that work was assigned.
    TaskAccepted(TaskAccepted),
    /// Notice to the caller that no agent could take the work.
    TaskRejected(TaskRejected),
    /// Terminal result routed to the caller.
    TaskCompleted(TaskCompleted),
    /// Error reported to the originating session.
    Error(ErrorEvent),
}

impl OutboundEvent {
    /// Returns the wire event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Connected(_) => "connected",
            Self::AgentRegistered(_) => "agent_registered",
            Self::AgentAvailable(_) => "agent_available",
            Self::AgentUnavailable(_) => "agent_unavailable",
            Self::HeartbeatAck(_) => "heartbeat_ack",
            Self::HeartbeatRequest(_) => "heartbeat_request",
            Self::TaskAssigned(_) => "task_assigned",
            Self::TaskAccepted(_) => "task_accepted",
            Self::TaskRejected(_) => "task_rejected",
            Self::TaskCompleted(_) => "task_completed",
            Self::Error(_) => "error",
        }
    }

    /// Encodes the event as a text frame.
    ///
    /// # Errors
    ///
    /// Returns the serialization error if a payload cannot be encoded.
    pub fn encode(&self) -> Result<Arc<str>, serde_json::Error> {
        serde_json::to_string(self).map(Arc::from)
    }
}

impl From<DispatchError> for OutboundEvent {
    fn from(err: DispatchError) -> Self {
        Self::Error(ErrorEvent::from(&err))
    }
}

/// Recipients of an outbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// One session, by identifier.
    Session(SessionId),
    /// Whichever session currently holds the identity.
    Identity(Identity),
    /// Every caller session.
    Callers,
    /// Every agent session, optionally only those serving a task type.
    Agents(Option<TaskType>),
}

/// An event paired with its recipients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Recipients.
    pub target: Target,
    /// Event to send.
    pub event: OutboundEvent,
}

impl Delivery {
    /// Targets a single session.
    #[must_use]
    pub const fn to_session(session_id: SessionId, event: OutboundEvent) -> Self {
        Self {
            target: Target::Session(session_id),
            event,
        }
    }

    /// Targets the session holding `identity`.
    #[must_use]
    pub const fn to_identity(identity: Identity, event: OutboundEvent) -> Self {
        Self {
            target: Target::Identity(identity),
            event,
        }
    }

    /// Targets every caller session.
    #[must_use]
    pub const fn to_callers(event: OutboundEvent) -> Self {
        Self {
            target: Target::Callers,
            event,
        }
    }

    /// Targets agent sessions.
    #[must_use]
    pub const fn to_agents(task_type: Option<TaskType>, event: OutboundEvent) -> Self {
        Self {
            target: Target::Agents(task_type),
            event,
        }
    }
}
