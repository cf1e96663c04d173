//! Application services for agent registration, liveness and selection.

mod directory;
mod liveness;

pub use directory::{
    AgentDirectory, AgentDirectoryError, AgentDirectoryResult, RegisterAgentRequest,
};
pub use liveness::{
    DEFAULT_HEARTBEAT_TIMEOUT, LivenessPolicy, SweepHandler, spawn_liveness_sweep,
};
