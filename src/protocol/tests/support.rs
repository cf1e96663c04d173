//! Message builders and delivery matchers shared by the engine tests.

use crate::agent::domain::{AgentId, AgentName, AgentStatus, TaskType};
use crate::protocol::{
    Delivery, InboundMessage, OutboundEvent, Target,
    messages::{Heartbeat, RegisterAgent, TaskRequest, TaskResult},
};
use crate::session::domain::SessionId;
use crate::task::domain::{CallerId, TaskId, TaskOutcome, TaskPayload};

pub(super) fn task_type(raw: &str) -> TaskType {
    TaskType::new(raw).expect("valid task type")
}

pub(super) fn payload(raw: &str) -> TaskPayload {
    TaskPayload::from_json(raw).expect("valid payload")
}

pub(super) fn register(agent_id: AgentId, kind: &str) -> InboundMessage {
    InboundMessage::Register(RegisterAgent {
        agent_id,
        name: AgentName::new(format!("{kind} solver")).expect("valid name"),
        task_type: task_type(kind),
        capabilities: None,
    })
}

pub(super) fn heartbeat(agent_id: AgentId) -> InboundMessage {
    InboundMessage::Heartbeat(Heartbeat {
        agent_id,
        status: AgentStatus::Active,
    })
}

pub(super) fn request(caller_id: CallerId, kind: &str, input: &str) -> InboundMessage {
    InboundMessage::TaskRequest(TaskRequest {
        caller_id,
        task_type: task_type(kind),
        input: payload(input),
    })
}

pub(super) fn result(task_id: TaskId, output: &str) -> InboundMessage {
    InboundMessage::TaskResult(TaskResult {
        task_id,
        output: Some(payload(output)),
        status: TaskOutcome::Completed,
        error: None,
    })
}

/// Returns the single event addressed to `session_id`.
pub(super) fn only_to_session(deliveries: &[Delivery], session_id: SessionId) -> &OutboundEvent {
    let matching: Vec<&OutboundEvent> = deliveries
        .iter()
        .filter(|delivery| delivery.target == Target::Session(session_id))
        .map(|delivery| &delivery.event)
        .collect();
    assert_eq!(matching.len(), 1, "expected one event for {session_id}: {deliveries:?}");
    matching[0]
}

/// Returns the code of an `error` event, panicking on anything else.
pub(super) fn error_code(event: &OutboundEvent) -> crate::protocol::ErrorCode {
    match event {
        OutboundEvent::Error(err) => err.code,
        other => panic!("expected an error event, got {other:?}"),
    }
}
