//! Domain model for agent registration and liveness.
//!
//! The agent domain models registration metadata, the declared task-type
//! capability, and the liveness status driven by heartbeats. All
//! infrastructure concerns are kept outside the domain boundary.

mod agent;
mod capabilities;
mod error;
mod ids;
mod name;
mod status;
mod task_type;

pub use agent::{Agent, NewAgent, PersistedAgentData};
pub use capabilities::AgentCapabilities;
pub use error::{AgentDomainError, ParseAgentStatusError};
pub use ids::AgentId;
pub use name::AgentName;
pub use status::AgentStatus;
pub use task_type::TaskType;
