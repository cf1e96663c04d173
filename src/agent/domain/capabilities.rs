//! Agent feature-set metadata.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque key/value feature map declared by an agent on registration.
///
/// The hub never interprets the contents; they are stored with the agent
/// record and echoed to callers in `agent_available` notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentCapabilities(Map<String, Value>);

impl AgentCapabilities {
    /// Creates an empty capability map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces one capability entry.
    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Returns the value declared for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the underlying map.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Returns whether no capabilities were declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for AgentCapabilities {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}
