//! Logical identities a session can be bound to.

use crate::agent::domain::AgentId;
use crate::task::domain::CallerId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role a session plays in the dispatch protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionRole {
    /// No registration or request has been seen yet.
    #[default]
    Unassigned,
    /// The session serves work as an agent.
    Agent,
    /// The session requests work as a caller.
    Caller,
}

impl SessionRole {
    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unassigned => "unassigned",
            Self::Agent => "agent",
            Self::Caller => "caller",
        }
    }
}

impl fmt::Display for SessionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity held by a bound session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "snake_case")]
pub enum Identity {
    /// A registered agent.
    Agent(AgentId),
    /// A caller requesting work.
    Caller(CallerId),
}

impl Identity {
    /// Returns the role this identity confers.
    #[must_use]
    pub const fn role(self) -> SessionRole {
        match self {
            Self::Agent(_) => SessionRole::Agent,
            Self::Caller(_) => SessionRole::Caller,
        }
    }
}

impl From<AgentId> for Identity {
    fn from(id: AgentId) -> Self {
        Self::Agent(id)
    }
}

impl From<CallerId> for Identity {
    fn from(id: CallerId) -> Self {
        Self::Caller(id)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Agent(id) => write!(f, "agent {id}"),
            Self::Caller(id) => write!(f, "caller {id}"),
        }
    }
}
