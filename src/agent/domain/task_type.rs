//! Task-type capability shared by agents and tasks.

use super::AgentDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_TASK_TYPE_LENGTH: usize = 255;

/// The kind of work an agent serves and a caller requests (e.g. `math`).
///
/// Matching is exact after trimming surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskType(String);

impl TaskType {
    /// Creates a validated task type.
    ///
    /// # Errors
    ///
    /// Returns [`AgentDomainError::EmptyTaskType`] when the value is empty
    /// after trimming, or [`AgentDomainError::TaskTypeTooLong`] when it
    /// exceeds 255 characters.
    pub fn new(value: impl Into<String>) -> Result<Self, AgentDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(AgentDomainError::EmptyTaskType);
        }
        if trimmed.chars().count() > MAX_TASK_TYPE_LENGTH {
            return Err(AgentDomainError::TaskTypeTooLong(raw));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the task type as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TaskType {
    type Error = AgentDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TaskType> for String {
    fn from(value: TaskType) -> Self {
        value.0
    }
}

impl AsRef<str> for TaskType {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
