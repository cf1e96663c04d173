//! Lock-guarded registry of live sessions and their identity index.
//!
//! The registry owns three maps behind one `parking_lot` lock: sessions by
//! identifier, and the agent and caller indexes naming the session that
//! currently holds each identity. The lock is only taken for in-memory
//! mutations and is never held across an `.await`.

use crate::agent::domain::{AgentId, TaskType};
use crate::session::domain::{Identity, RegistryError, Session, SessionId};
use crate::task::domain::CallerId;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Sending half of a session's outbound frame queue.
///
/// The queue is bounded; frames for a peer that has fallen this far behind
/// are dropped rather than buffered.
pub type Outbox = mpsc::Sender<Arc<str>>;

/// Frames a session may have queued before further frames are dropped.
pub const DEFAULT_OUTBOX_CAPACITY: usize = 256;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Effect of a successful bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindOutcome {
    /// Session that previously held the identity, when it moved here from
    /// another connection.
    pub displaced: Option<SessionId>,
}

/// Identity released when a session was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unbound {
    /// Identity the closed session held.
    pub identity: Identity,
    /// Whether the closed session was still the index entry for the
    /// identity. `false` when another connection had since taken it over.
    pub current: bool,
}

#[derive(Debug)]
struct SessionEntry {
    session: Session,
    outbox: Outbox,
}

#[derive(Debug, Default)]
struct RegistryState {
    sessions: HashMap<SessionId, SessionEntry>,
    agents: HashMap<AgentId, SessionId>,
    callers: HashMap<CallerId, SessionId>,
}

impl RegistryState {
    fn index_of(&self, identity: Identity) -> Option<SessionId> {
        match identity {
            Identity::Agent(id) => self.agents.get(&id).copied(),
            Identity::Caller(id) => self.callers.get(&id).copied(),
        }
    }

    fn check_bindable(&self, session_id: SessionId, identity: Identity) -> RegistryResult<()> {
        let entry = self
            .sessions
            .get(&session_id)
            .ok_or(RegistryError::UnknownSession(session_id))?;
        match entry.session.identity() {
            Some(existing) if existing != identity => Err(RegistryError::AlreadyBound {
                session_id,
                existing,
                requested: identity,
            }),
            _ => Ok(()),
        }
    }

    fn outboxes<'a>(&'a self, ids: impl Iterator<Item = &'a SessionId>) -> Vec<Outbox> {
        ids.filter_map(|id| self.sessions.get(id))
            .map(|entry| entry.outbox.clone())
            .collect()
    }
}

/// Registry of live sessions shared by every connection handler.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    state: RwLock<RegistryState>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a freshly connected, unassigned session.
    pub fn connect(
        &self,
        session_id: SessionId,
        connected_at: DateTime<Utc>,
        outbox: Outbox,
    ) -> Session {
        let session = Session::new(session_id, connected_at);
        self.state.write().sessions.insert(
            session_id,
            SessionEntry {
                session: session.clone(),
                outbox,
            },
        );
        session
    }

    /// Checks that `session_id` could be bound to `identity` without
    /// changing anything.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownSession`] or
    /// [`RegistryError::AlreadyBound`].
    pub fn ensure_bindable(&self, session_id: SessionId, identity: Identity) -> RegistryResult<()> {
        self.state.read().check_bindable(session_id, identity)
    }

    /// Associates a session with a logical identity.
    ///
    /// Rebinding the identity the session already holds is a no-op. When the
    /// identity is held by another session the index moves here and the
    /// previous holder is reported in [`BindOutcome::displaced`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownSession`] when the session is not
    /// connected, or [`RegistryError::AlreadyBound`] when it already holds a
    /// different identity.
    pub fn bind(&self, session_id: SessionId, identity: Identity) -> RegistryResult<BindOutcome> {
        self.bind_with(session_id, identity, None)
    }

    /// Binds an agent session and records the task type it serves.
    ///
    /// # Errors
    ///
    /// See [`ConnectionRegistry::bind`].
    pub fn bind_agent(
        &self,
        session_id: SessionId,
        agent_id: AgentId,
        task_type: TaskType,
    ) -> RegistryResult<BindOutcome> {
        self.bind_with(session_id, Identity::Agent(agent_id), Some(task_type))
    }

    fn bind_with(
        &self,
        session_id: SessionId,
        identity: Identity,
        task_type: Option<TaskType>,
    ) -> RegistryResult<BindOutcome> {
        let mut state = self.state.write();
        state.check_bindable(session_id, identity)?;

        let previous = match identity {
            Identity::Agent(id) => state.agents.insert(id, session_id),
            Identity::Caller(id) => state.callers.insert(id, session_id),
        };
        if let Some(entry) = state.sessions.get_mut(&session_id) {
            entry.session.assign(identity);
            if let Some(task_type) = task_type {
                entry.session.serve(task_type);
            }
        }

        let displaced = previous.filter(|previous| *previous != session_id);
        if let Some(displaced) = displaced {
            debug!(%session_id, %displaced, %identity, "identity moved to a new session");
        }
        Ok(BindOutcome { displaced })
    }

    /// Returns the session currently holding `identity`.
    #[must_use]
    pub fn lookup(&self, identity: Identity) -> Option<SessionId> {
        self.state.read().index_of(identity)
    }

    /// Removes a closed session.
    ///
    /// Returns the identity it held, or `None` for unknown and unassigned
    /// sessions. The identity's index entry is only dropped when it still
    /// names this session.
    pub fn unbind(&self, session_id: SessionId) -> Option<Unbound> {
        let mut state = self.state.write();
        let entry = state.sessions.remove(&session_id)?;
        let identity = entry.session.identity()?;

        let current = state.index_of(identity) == Some(session_id);
        if current {
            match identity {
                Identity::Agent(id) => {
                    state.agents.remove(&id);
                }
                Identity::Caller(id) => {
                    state.callers.remove(&id);
                }
            }
        }
        Some(Unbound { identity, current })
    }

    /// Returns a snapshot of a live session.
    #[must_use]
    pub fn session(&self, session_id: SessionId) -> Option<Session> {
        self.state
            .read()
            .sessions
            .get(&session_id)
            .map(|entry| entry.session.clone())
    }

    /// Returns a live session's outbox.
    #[must_use]
    pub fn outbox(&self, session_id: SessionId) -> Option<Outbox> {
        self.state
            .read()
            .sessions
            .get(&session_id)
            .map(|entry| entry.outbox.clone())
    }

    /// Returns the outbox of the session currently holding `identity`.
    #[must_use]
    pub fn outbox_for(&self, identity: Identity) -> Option<Outbox> {
        let state = self.state.read();
        let session_id = state.index_of(identity)?;
        state
            .sessions
            .get(&session_id)
            .map(|entry| entry.outbox.clone())
    }

    /// Returns the outboxes of every connected caller.
    #[must_use]
    pub fn caller_outboxes(&self) -> Vec<Outbox> {
        let state = self.state.read();
        state.outboxes(state.callers.values())
    }

    /// Returns the outboxes of connected agents, optionally limited to those
    /// serving `task_type`.
    #[must_use]
    pub fn agent_outboxes(&self, task_type: Option<&TaskType>) -> Vec<Outbox> {
        let state = self.state.read();
        state
            .agents
            .values()
            .filter_map(|id| state.sessions.get(id))
            .filter(|entry| task_type.is_none_or(|wanted| entry.session.task_type() == Some(wanted)))
            .map(|entry| entry.outbox.clone())
            .collect()
    }

    /// Returns the identifiers of every connected agent, in ascending order.
    #[must_use]
    pub fn connected_agents(&self) -> Vec<AgentId> {
        let mut agents: Vec<AgentId> = self.state.read().agents.keys().copied().collect();
        agents.sort_unstable();
        agents
    }

    /// Returns whether some live session holds `identity`.
    #[must_use]
    pub fn is_connected(&self, identity: Identity) -> bool {
        self.lookup(identity).is_some()
    }

    /// Returns the number of live sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.state.read().sessions.len()
    }
}
