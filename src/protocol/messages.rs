//! Inbound wire messages.
//!
//! Frames are JSON objects of the form `{"type": ..., "payload": {...}}`.
//! Decoding is two-stage: the envelope is read first with the payload kept
//! as raw text, then the payload is parsed into the struct for its type.
//! This keeps task inputs byte-exact, which a buffered tagged-enum decode
//! would not.

use super::error::ValidationError;
use crate::agent::domain::{AgentCapabilities, AgentId, AgentName, AgentStatus, TaskType};
use crate::task::domain::{CallerId, TaskCompletion, TaskId, TaskOutcome, TaskPayload};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;

/// Payload of a `register` message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisterAgent {
    /// Agent identity.
    pub agent_id: AgentId,
    /// Display name.
    #[serde(alias = "agent_name")]
    pub name: AgentName,
    /// Task type the agent serves.
    #[serde(alias = "agent_type")]
    pub task_type: TaskType,
    /// Declared feature set.
    #[serde(default)]
    pub capabilities: Option<AgentCapabilities>,
}

/// Payload of a `heartbeat` message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Heartbeat {
    /// Agent identity.
    pub agent_id: AgentId,
    /// Status the agent reports for itself.
    #[serde(default)]
    pub status: AgentStatus,
}

/// Payload of a `task_request` message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskRequest {
    /// Caller identity.
    #[serde(alias = "user_id")]
    pub caller_id: CallerId,
    /// Requested task type.
    pub task_type: TaskType,
    /// Input handed to the agent verbatim.
    #[serde(alias = "input_data")]
    pub input: TaskPayload,
}

/// Payload of a `task_result` message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskResult {
    /// Task the result belongs to.
    pub task_id: TaskId,
    /// Agent output, if any.
    #[serde(default, alias = "output_data")]
    pub output: Option<TaskPayload>,
    /// Reported outcome.
    #[serde(default)]
    pub status: TaskOutcome,
    /// Error detail, if any.
    #[serde(default, alias = "error_message")]
    pub error: Option<String>,
}

impl TaskResult {
    /// Converts the payload into the completion applied to the task.
    #[must_use]
    pub fn into_completion(self) -> TaskCompletion {
        let mut completion = TaskCompletion::new(self.status);
        if let Some(output) = self.output {
            completion = completion.with_output(output);
        }
        if let Some(error) = self.error {
            completion = completion.with_error(error);
        }
        completion
    }
}

/// Closed set of messages a session may send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// An agent announces itself.
    Register(RegisterAgent),
    /// An agent proves liveness.
    Heartbeat(Heartbeat),
    /// A caller asks for work to be done.
    TaskRequest(TaskRequest),
    /// An agent reports a terminal result.
    TaskResult(TaskResult),
}

impl InboundMessage {
    /// Returns the canonical message type name.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Register(_) => "register",
            Self::Heartbeat(_) => "heartbeat",
            Self::TaskRequest(_) => "task_request",
            Self::TaskResult(_) => "task_result",
        }
    }

    /// Decodes a text frame.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] describing the first problem found.
    pub fn decode(frame: &str) -> Result<Self, ValidationError> {
        let envelope: Envelope<'_> = serde_json::from_str(frame).map_err(|err| {
            if err.is_syntax() || err.is_eof() {
                ValidationError::InvalidJson
            } else {
                ValidationError::MalformedEnvelope(err.to_string())
            }
        })?;
        let kind = envelope.kind.ok_or(ValidationError::MissingType)?;
        let payload = envelope.payload.map_or("{}", RawValue::get);

        match kind.as_str() {
            "register" | "agent_register" => parse("register", payload).map(Self::Register),
            "heartbeat" | "agent_heartbeat" => parse("heartbeat", payload).map(Self::Heartbeat),
            "task_request" => {
                let request: TaskRequest = parse("task_request", payload)?;
                if request.input.is_null() {
                    return Err(ValidationError::NullInput);
                }
                Ok(Self::TaskRequest(request))
            }
            "task_result" => parse("task_result", payload).map(Self::TaskResult),
            _ => Err(ValidationError::UnknownType(kind)),
        }
    }
}

#[derive(Deserialize)]
struct Envelope<'a> {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(borrow)]
    payload: Option<&'a RawValue>,
}

fn parse<T: DeserializeOwned>(kind: &'static str, payload: &str) -> Result<T, ValidationError> {
    serde_json::from_str(payload).map_err(|err| ValidationError::InvalidPayload {
        kind,
        reason: err.to_string(),
    })
}
