//! Task lifecycle store for the dispatch hub.
//!
//! A task is created once a request has been matched to an agent, is moved to
//! `assigned` in the same step, and is mutated exactly once more by the
//! agent's terminal result. Durable records live behind the
//! [`ports::TaskRepository`] storage port. The module follows hexagonal
//! architecture:
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
