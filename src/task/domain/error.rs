//! Error types for task domain validation and parsing.

use super::{TaskId, TaskStatus};
use thiserror::Error;

/// Errors returned while mutating task aggregates.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The requested state transition is not permitted by the lifecycle.
    #[error("task {task_id} cannot transition from {from} to {to}")]
    InvalidStateTransition {
        /// Task whose transition was rejected.
        task_id: TaskId,
        /// Current state.
        from: TaskStatus,
        /// Requested state.
        to: TaskStatus,
    },

    /// The task already reached a terminal state.
    #[error("task {task_id} already finished as {status}")]
    AlreadyTerminal {
        /// Task that was completed twice.
        task_id: TaskId,
        /// Terminal state recorded by the first completion.
        status: TaskStatus,
    },
}

/// Error returned while parsing task states from persistence or the wire.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);
