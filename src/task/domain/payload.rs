//! Opaque JSON payloads carried by tasks.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::fmt;

/// Structured task data passed through the hub verbatim.
///
/// The payload keeps the exact JSON text it was decoded from, so the input an
/// agent receives is byte-for-byte the input the caller sent.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskPayload(Box<RawValue>);

impl TaskPayload {
    /// Parses `json` into a payload, keeping its original text.
    ///
    /// # Errors
    ///
    /// Returns the parse error when `json` is not a single valid JSON value.
    pub fn from_json(json: impl Into<String>) -> Result<Self, serde_json::Error> {
        RawValue::from_string(json.into()).map(Self)
    }

    /// Serializes `value` into a payload.
    ///
    /// # Errors
    ///
    /// Returns the serialization error when `value` cannot be represented as
    /// JSON.
    pub fn from_value(value: &impl Serialize) -> Result<Self, serde_json::Error> {
        serde_json::value::to_raw_value(value).map(Self)
    }

    /// Returns the payload's JSON text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.get()
    }

    /// Returns whether the payload is the JSON literal `null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.as_str().trim() == "null"
    }

    /// Parses the payload into a [`serde_json::Value`].
    ///
    /// # Errors
    ///
    /// Returns the parse error if the stored text is somehow not valid JSON.
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(self.as_str())
    }
}

impl PartialEq for TaskPayload {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for TaskPayload {}

impl fmt::Debug for TaskPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TaskPayload").field(&self.as_str()).finish()
    }
}

impl fmt::Display for TaskPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
