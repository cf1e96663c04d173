//! Resolves deliveries to session outboxes.
//!
//! Sends are fire-and-forget: a frame is queued on the session's outbox and
//! no confirmation beyond the transport's own is awaited. Recipients that
//! have disconnected are skipped, and a recipient whose outbox is full loses
//! the frame.

use super::events::{Delivery, OutboundEvent, Target};
use crate::agent::domain::{AgentId, TaskType};
use crate::session::{
    domain::{Identity, SessionId},
    services::{ConnectionRegistry, Outbox},
};
use crate::task::domain::CallerId;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, warn};

/// Outbound fan-out over the connection registry.
#[derive(Debug, Clone)]
pub struct Router {
    registry: Arc<ConnectionRegistry>,
}

impl Router {
    /// Creates a router over the shared registry.
    #[must_use]
    pub const fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Sends every delivery to its recipients.
    pub fn deliver(&self, deliveries: impl IntoIterator<Item = Delivery>) {
        for Delivery { target, event } in deliveries {
            let delivered = match &target {
                Target::Session(session_id) => usize::from(self.send_to_session(*session_id, &event)),
                Target::Identity(identity) => usize::from(self.send_to(*identity, &event)),
                Target::Callers => self.broadcast_to_callers(&event),
                Target::Agents(task_type) => self.broadcast_to_agents(&event, task_type.as_ref()),
            };
            debug!(event = event.name(), ?target, delivered, "event routed");
        }
    }

    /// Sends an event to one session. Returns whether it was queued.
    pub fn send_to_session(&self, session_id: SessionId, event: &OutboundEvent) -> bool {
        self.registry
            .outbox(session_id)
            .is_some_and(|outbox| send_one(&outbox, event))
    }

    /// Sends an event to an agent's current session. Returns whether the
    /// agent was connected.
    pub fn send_to_agent(&self, agent_id: AgentId, event: &OutboundEvent) -> bool {
        self.send_to(Identity::Agent(agent_id), event)
    }

    /// Sends an event to a caller's current session. Returns whether the
    /// caller was connected.
    pub fn send_to_caller(&self, caller_id: CallerId, event: &OutboundEvent) -> bool {
        self.send_to(Identity::Caller(caller_id), event)
    }

    /// Sends an event to agent sessions, optionally only those serving
    /// `task_type`. Returns the number of sessions reached.
    pub fn broadcast_to_agents(&self, event: &OutboundEvent, task_type: Option<&TaskType>) -> usize {
        broadcast(&self.registry.agent_outboxes(task_type), event)
    }

    /// Sends an event to every caller session. Returns the number reached.
    pub fn broadcast_to_callers(&self, event: &OutboundEvent) -> usize {
        broadcast(&self.registry.caller_outboxes(), event)
    }

    fn send_to(&self, identity: Identity, event: &OutboundEvent) -> bool {
        match self.registry.outbox_for(identity) {
            Some(outbox) => send_one(&outbox, event),
            None => {
                debug!(event = event.name(), %identity, "recipient not connected");
                false
            }
        }
    }
}

fn encode(event: &OutboundEvent) -> Option<Arc<str>> {
    event
        .encode()
        .inspect_err(|err| error!(event = event.name(), error = %err, "failed to encode event"))
        .ok()
}

fn send_one(outbox: &Outbox, event: &OutboundEvent) -> bool {
    encode(event).is_some_and(|frame| enqueue(outbox, frame, event))
}

fn broadcast(outboxes: &[Outbox], event: &OutboundEvent) -> usize {
    if outboxes.is_empty() {
        return 0;
    }
    let Some(frame) = encode(event) else {
        return 0;
    };
    outboxes
        .iter()
        .filter(|outbox| enqueue(outbox, Arc::clone(&frame), event))
        .count()
}

fn enqueue(outbox: &Outbox, frame: Arc<str>, event: &OutboundEvent) -> bool {
    match outbox.try_send(frame) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!(event = event.name(), "outbox full, frame dropped");
            false
        }
        Err(TrySendError::Closed(_)) => false,
    }
}
