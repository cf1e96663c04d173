//! Port contracts for agent persistence.
//!
//! Ports define infrastructure-agnostic interfaces used by the agent
//! directory service.

pub mod repository;

pub use repository::{AgentRepository, AgentRepositoryError, AgentRepositoryResult};
