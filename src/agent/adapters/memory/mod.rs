//! In-memory agent storage.

mod agent;

pub use agent::InMemoryAgentRepository;
