//! Service layer for task creation, completion and retrieval.

use crate::agent::domain::{AgentId, TaskType};
use crate::task::{
    domain::{CallerId, NewTask, Task, TaskCompletion, TaskDomainError, TaskId, TaskPayload},
    ports::{TaskRepository, TaskRepositoryError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Request payload for recording a matched task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    caller_id: CallerId,
    agent_id: AgentId,
    task_type: TaskType,
    input: TaskPayload,
}

impl CreateTaskRequest {
    /// Creates a request for work matched to `agent_id`.
    #[must_use]
    pub const fn new(
        caller_id: CallerId,
        agent_id: AgentId,
        task_type: TaskType,
        input: TaskPayload,
    ) -> Self {
        Self {
            caller_id,
            agent_id,
            task_type,
            input,
        }
    }
}

/// Service-level errors for task lifecycle operations.
#[derive(Debug, Error)]
pub enum TaskLifecycleError {
    /// No task exists with the identifier.
    #[error("unknown task: {0}")]
    NotFound(TaskId),
    /// A terminal result was already applied; carries the stored record.
    #[error("duplicate completion for task {}", .0.id())]
    DuplicateCompletion(Box<Task>),
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(TaskRepositoryError),
}

impl From<TaskRepositoryError> for TaskLifecycleError {
    fn from(err: TaskRepositoryError) -> Self {
        match err {
            TaskRepositoryError::NotFound(id) => Self::NotFound(id),
            TaskRepositoryError::AlreadyTerminal(task) => Self::DuplicateCompletion(task),
            TaskRepositoryError::Domain(domain) => Self::Domain(domain),
            other => Self::Repository(other),
        }
    }
}

/// Result type for task lifecycle service operations.
pub type TaskLifecycleResult<T> = Result<T, TaskLifecycleError>;

/// Task lifecycle orchestration service.
#[derive(Clone)]
pub struct TaskLifecycleService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> TaskLifecycleService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new task lifecycle service.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self { repository, clock }
    }

    /// Records a matched task and moves it straight to `assigned`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when the repository rejects
    /// persistence.
    pub async fn create(&self, request: CreateTaskRequest) -> TaskLifecycleResult<Task> {
        let mut task = Task::new(
            NewTask {
                caller_id: request.caller_id,
                agent_id: request.agent_id,
                task_type: request.task_type,
                input: request.input,
            },
            &*self.clock,
        );
        task.mark_assigned(&*self.clock)?;
        self.repository.store(&task).await?;
        Ok(task)
    }

    /// Applies an agent's terminal result.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for unknown tasks and
    /// [`TaskLifecycleError::DuplicateCompletion`], carrying the unchanged
    /// record, when the task already finished.
    pub async fn complete(
        &self,
        task_id: TaskId,
        completion: TaskCompletion,
    ) -> TaskLifecycleResult<Task> {
        let task = self
            .repository
            .complete(task_id, completion, self.clock.utc())
            .await?;
        Ok(task)
    }

    /// Marks a task failed on behalf of the hub.
    ///
    /// # Errors
    ///
    /// See [`TaskLifecycleService::complete`].
    pub async fn fail(
        &self,
        task_id: TaskId,
        reason: impl Into<String> + Send,
    ) -> TaskLifecycleResult<Task> {
        self.complete(task_id, TaskCompletion::failed(reason)).await
    }

    /// Retrieves a task by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when persistence lookup
    /// fails.
    pub async fn find_by_id(&self, task_id: TaskId) -> TaskLifecycleResult<Option<Task>> {
        Ok(self.repository.find_by_id(task_id).await?)
    }
}
