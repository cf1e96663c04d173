//! Error types for agent domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing agent domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AgentDomainError {
    /// The agent display name is empty after trimming.
    #[error("agent name must not be empty")]
    EmptyAgentName,

    /// The agent display name exceeds the storage limit.
    #[error("agent name exceeds 255 character limit: {0}")]
    AgentNameTooLong(String),

    /// The task type is empty after trimming.
    #[error("task type must not be empty")]
    EmptyTaskType,

    /// The task type exceeds the storage limit.
    #[error("task type exceeds 255 character limit: {0}")]
    TaskTypeTooLong(String),
}

/// Error returned while parsing agent status from persistence or the wire.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown agent status: {0}")]
pub struct ParseAgentStatusError(pub String);
