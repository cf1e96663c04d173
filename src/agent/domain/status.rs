//! Agent liveness status.

use super::ParseAgentStatusError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Liveness status of a registered agent.
///
/// Status alone does not make an agent eligible; its heartbeat must also be
/// within the timeout window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Connected and accepting work.
    #[default]
    Active,
    /// Disconnected, silent past the timeout, or self-reported unavailable.
    Inactive,
}

impl AgentStatus {
    /// Returns whether the status admits new work.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        if self.is_active() { "active" } else { "inactive" }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentStatus {
    type Err = ParseAgentStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        [Self::Active, Self::Inactive]
            .into_iter()
            .find(|status| value.trim().eq_ignore_ascii_case(status.as_str()))
            .ok_or_else(|| ParseAgentStatusError(value.to_owned()))
    }
}
