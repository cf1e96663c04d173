//! Identifier type for transport sessions.

use crate::macros::uuid_identifier;

uuid_identifier!(
    /// Opaque identifier the transport assigns to each connection.
    SessionId
);
