//! Error types for connection registry operations.

use super::{Identity, SessionId};
use thiserror::Error;

/// Errors returned by the connection registry.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The session is not connected.
    #[error("unknown session: {0}")]
    UnknownSession(SessionId),

    /// The session already holds a different identity.
    #[error("session {session_id} is already bound to {existing}, cannot bind {requested}")]
    AlreadyBound {
        /// Session that rejected the binding.
        session_id: SessionId,
        /// Identity the session already holds.
        existing: Identity,
        /// Identity that was requested.
        requested: Identity,
    },
}
