//! Task aggregate root and related lifecycle types.

use super::{CallerId, ParseTaskStatusError, TaskDomainError, TaskId, TaskPayload};
use crate::agent::domain::{AgentId, TaskType};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task record exists but has not been handed to its agent.
    Pending,
    /// Task has been handed to its agent.
    Assigned,
    /// Agent reported success.
    Completed,
    /// Agent reported failure, or the assignment could not be delivered.
    Failed,
}

impl TaskStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Returns whether no further transitions are permitted.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns whether the lifecycle permits moving from `self` to `target`.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Assigned) | (Self::Assigned, Self::Completed | Self::Failed)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "assigned" => Ok(Self::Assigned),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

/// Terminal outcome reported by an agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    /// The work succeeded.
    #[default]
    Completed,
    /// The work failed.
    Failed,
}

impl From<TaskOutcome> for TaskStatus {
    fn from(outcome: TaskOutcome) -> Self {
        match outcome {
            TaskOutcome::Completed => Self::Completed,
            TaskOutcome::Failed => Self::Failed,
        }
    }
}

/// Terminal result applied to a task exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCompletion {
    outcome: TaskOutcome,
    output: Option<TaskPayload>,
    error: Option<String>,
}

impl TaskCompletion {
    /// Creates a completion with the given outcome and no output or error.
    #[must_use]
    pub const fn new(outcome: TaskOutcome) -> Self {
        Self {
            outcome,
            output: None,
            error: None,
        }
    }

    /// Creates a failed completion carrying `reason`.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::new(TaskOutcome::Failed).with_error(reason)
    }

    /// Sets the agent's output payload.
    #[must_use]
    pub fn with_output(mut self, output: TaskPayload) -> Self {
        self.output = Some(output);
        self
    }

    /// Sets the error detail.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Returns the reported outcome.
    #[must_use]
    pub const fn outcome(&self) -> TaskOutcome {
        self.outcome
    }

    /// Returns the output payload, if any.
    #[must_use]
    pub const fn output(&self) -> Option<&TaskPayload> {
        self.output.as_ref()
    }

    /// Returns the error detail, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Parameters for creating a task once a request has been matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    /// Caller that requested the work.
    pub caller_id: CallerId,
    /// Agent chosen by the matchmaker.
    pub agent_id: AgentId,
    /// Requested task type.
    pub task_type: TaskType,
    /// Caller-supplied input.
    pub input: TaskPayload,
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    caller_id: CallerId,
    agent_id: AgentId,
    task_type: TaskType,
    input: TaskPayload,
    status: TaskStatus,
    output: Option<TaskPayload>,
    error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted requesting caller.
    pub caller_id: CallerId,
    /// Persisted assigned agent.
    pub agent_id: AgentId,
    /// Persisted task type.
    pub task_type: TaskType,
    /// Persisted input payload.
    pub input: TaskPayload,
    /// Persisted lifecycle state.
    pub status: TaskStatus,
    /// Persisted output payload, if any.
    pub output: Option<TaskPayload>,
    /// Persisted error detail, if any.
    pub error: Option<String>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest lifecycle timestamp.
    pub updated_at: DateTime<Utc>,
    /// Persisted completion timestamp, if terminal.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates a pending task bound to its agent.
    #[must_use]
    pub fn new(task: NewTask, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: TaskId::new(),
            caller_id: task.caller_id,
            agent_id: task.agent_id,
            task_type: task.task_type,
            input: task.input,
            status: TaskStatus::Pending,
            output: None,
            error: None,
            created_at: timestamp,
            updated_at: timestamp,
            completed_at: None,
        }
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            caller_id: data.caller_id,
            agent_id: data.agent_id,
            task_type: data.task_type,
            input: data.input,
            status: data.status,
            output: data.output,
            error: data.error,
            created_at: data.created_at,
            updated_at: data.updated_at,
            completed_at: data.completed_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the requesting caller.
    #[must_use]
    pub const fn caller_id(&self) -> CallerId {
        self.caller_id
    }

    /// Returns the assigned agent.
    #[must_use]
    pub const fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    /// Returns the requested task type.
    #[must_use]
    pub const fn task_type(&self) -> &TaskType {
        &self.task_type
    }

    /// Returns the caller's input payload.
    #[must_use]
    pub const fn input(&self) -> &TaskPayload {
        &self.input
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the agent's output payload, if any.
    #[must_use]
    pub const fn output(&self) -> Option<&TaskPayload> {
        self.output.as_ref()
    }

    /// Returns the error detail, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
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

    /// Returns the completion timestamp once terminal.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Moves a pending task to [`TaskStatus::Assigned`].
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] unless the task is
    /// pending.
    pub fn mark_assigned(&mut self, clock: &impl Clock) -> Result<(), TaskDomainError> {
        self.transition_to(TaskStatus::Assigned, clock.utc())
    }

    /// Applies the terminal result.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::AlreadyTerminal`] when a result was already
    /// applied, or [`TaskDomainError::InvalidStateTransition`] when the task
    /// was never assigned.
    pub fn complete(
        &mut self,
        completion: TaskCompletion,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.complete_at(completion, clock.utc())
    }

    /// Applies the terminal result with an explicit timestamp.
    ///
    /// Used by repositories that apply the transition under their own lock.
    ///
    /// # Errors
    ///
    /// See [`Task::complete`].
    pub fn complete_at(
        &mut self,
        completion: TaskCompletion,
        at: DateTime<Utc>,
    ) -> Result<(), TaskDomainError> {
        if self.status.is_terminal() {
            return Err(TaskDomainError::AlreadyTerminal {
                task_id: self.id,
                status: self.status,
            });
        }
        self.transition_to(completion.outcome.into(), at)?;
        self.output = completion.output;
        self.error = completion.error;
        self.completed_at = Some(at);
        Ok(())
    }

    fn transition_to(&mut self, target: TaskStatus, at: DateTime<Utc>) -> Result<(), TaskDomainError> {
        if !self.status.can_transition_to(target) {
            return Err(TaskDomainError::InvalidStateTransition {
                task_id: self.id,
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        self.updated_at = at;
        Ok(())
    }
}
