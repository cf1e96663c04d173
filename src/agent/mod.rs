//! Agent directory for the dispatch hub.
//!
//! Tracks registered agents, the task type each one serves, and their
//! liveness. Durable agent records live behind the [`ports::AgentRepository`]
//! storage port; the [`services::AgentDirectory`] layers heartbeat-timeout
//! eligibility and least-recently-assigned rotation on top. The module
//! follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
