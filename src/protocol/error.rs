//! Error taxonomy for the dispatch protocol.
//!
//! Every error is reported to the originating session only and never closes
//! the connection. [`ErrorCode`] is the stable wire representation.

use crate::agent::{domain::AgentId, services::AgentDirectoryError};
use crate::session::domain::{Identity, RegistryError, SessionId};
use crate::task::{domain::TaskId, services::TaskLifecycleError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while decoding an inbound frame.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The frame is not valid JSON.
    #[error("invalid JSON frame")]
    InvalidJson,

    /// The frame is JSON but not a `{"type", "payload"}` envelope.
    #[error("malformed frame envelope: {0}")]
    MalformedEnvelope(String),

    /// The envelope has no `type` field.
    #[error("frame is missing its message type")]
    MissingType,

    /// The `type` names no known message.
    #[error("unknown message type: {0}")]
    UnknownType(String),

    /// The payload does not match the message's schema.
    #[error("invalid {kind} payload: {reason}")]
    InvalidPayload {
        /// Message type whose payload was rejected.
        kind: &'static str,
        /// Description of the field problem.
        reason: String,
    },

    /// A task request carried a `null` input.
    #[error("task_request input must not be null")]
    NullInput,

    /// The transport delivered a frame kind the protocol does not use.
    #[error("unsupported frame: {0}")]
    UnsupportedFrame(&'static str),
}

/// Stable error codes sent in `error` event payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed or missing fields.
    ValidationError,
    /// The agent never registered.
    UnknownAgent,
    /// The task does not exist.
    UnknownTask,
    /// The session already holds a different identity.
    AlreadyBound,
    /// A collaborator failed.
    InternalError,
}

impl ErrorCode {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "validation_error",
            Self::UnknownAgent => "unknown_agent",
            Self::UnknownTask => "unknown_task",
            Self::AlreadyBound => "already_bound",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors reported to a session by the dispatch engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// The inbound frame failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The agent never registered.
    #[error("unknown agent: {0}")]
    UnknownAgent(AgentId),

    /// The task does not exist.
    #[error("unknown task: {0}")]
    UnknownTask(TaskId),

    /// The session already holds a different identity.
    #[error("session {session_id} is already bound to {existing}")]
    AlreadyBound {
        /// Session that rejected the binding.
        session_id: SessionId,
        /// Identity the session already holds.
        existing: Identity,
    },

    /// A collaborator failed; the message is safe to show to clients.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    /// Returns the wire error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::ValidationError,
            Self::UnknownAgent(_) => ErrorCode::UnknownAgent,
            Self::UnknownTask(_) => ErrorCode::UnknownTask,
            Self::AlreadyBound { .. } => ErrorCode::AlreadyBound,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }
}

impl From<AgentDirectoryError> for DispatchError {
    fn from(err: AgentDirectoryError) -> Self {
        match err {
            AgentDirectoryError::UnknownAgent(id) => Self::UnknownAgent(id),
            AgentDirectoryError::Repository(inner) => Self::Internal(inner.to_string()),
        }
    }
}

impl From<TaskLifecycleError> for DispatchError {
    fn from(err: TaskLifecycleError) -> Self {
        match err {
            TaskLifecycleError::NotFound(id) => Self::UnknownTask(id),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<RegistryError> for DispatchError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::AlreadyBound {
                session_id,
                existing,
                ..
            } => Self::AlreadyBound {
                session_id,
                existing,
            },
            other @ RegistryError::UnknownSession(_) => Self::Internal(other.to_string()),
        }
    }
}

/// Result type for dispatch handlers.
pub type DispatchResult<T> = Result<T, DispatchError>;
