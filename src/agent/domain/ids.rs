//! Identifier types for the agent domain.

use crate::macros::uuid_identifier;

uuid_identifier!(
    /// Unique identifier for a registered agent.
    ///
    /// Agents choose their own identifier and present it on registration, so
    /// the same identifier survives reconnects.
    AgentId
);
