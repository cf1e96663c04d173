//! Dispatch hub: a real-time session and dispatch service.
//!
//! Agents connect over WebSocket, register for a task type and keep
//! themselves eligible with heartbeats. Callers submit task requests, which
//! the hub assigns to a connected, eligible agent and tracks until the
//! agent reports a result back to the caller.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for storage
//! - **Adapters**: Concrete implementations of ports (in-memory stores)
//! - **Services**: Orchestration over ports, generic over the clock
//!
//! # Modules
//!
//! - [`agent`]: Agent records, liveness and eligibility
//! - [`task`]: Task records and lifecycle
//! - [`session`]: Connected sessions and their bound identities
//! - [`matchmaker`]: Agent selection for incoming task requests
//! - [`protocol`]: Wire messages, the dispatch engine and the router
//! - [`transport`]: WebSocket listener
//! - [`server`]: Hub assembly and lifecycle
//! - [`config`]: TOML configuration
//! - [`observability`]: Logging setup

mod macros;

pub mod agent;
pub mod config;
pub mod matchmaker;
pub mod observability;
pub mod protocol;
pub mod server;
pub mod session;
pub mod task;
pub mod testing;
pub mod transport;
