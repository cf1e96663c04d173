//! Session snapshot type.

use super::{Identity, SessionId, SessionRole};
use crate::agent::domain::TaskType;
use chrono::{DateTime, Utc};

/// One live transport connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    connected_at: DateTime<Utc>,
    identity: Option<Identity>,
    task_type: Option<TaskType>,
}

impl Session {
    /// Creates an unassigned session.
    #[must_use]
    pub const fn new(id: SessionId, connected_at: DateTime<Utc>) -> Self {
        Self {
            id,
            connected_at,
            identity: None,
            task_type: None,
        }
    }

    /// Returns the session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Returns when the transport connected.
    #[must_use]
    pub const fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Returns the bound identity, if any.
    #[must_use]
    pub const fn identity(&self) -> Option<Identity> {
        self.identity
    }

    /// Returns the task type served, for agent sessions.
    #[must_use]
    pub const fn task_type(&self) -> Option<&TaskType> {
        self.task_type.as_ref()
    }

    /// Returns the session's role.
    #[must_use]
    pub fn role(&self) -> SessionRole {
        self.identity.map_or(SessionRole::Unassigned, Identity::role)
    }

    pub(crate) const fn assign(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }

    pub(crate) fn serve(&mut self, task_type: TaskType) {
        self.task_type = Some(task_type);
    }
}
