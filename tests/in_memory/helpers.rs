//! Shared harness for in-memory dispatch integration tests.
//!
//! Sessions are driven through the engine with JSON text frames exactly as
//! the transport would, and every outbound frame lands in the peer's inbox.

use std::sync::Arc;
use std::time::Duration;

use dispatch_hub::agent::{
    adapters::memory::InMemoryAgentRepository, domain::AgentId, services::LivenessPolicy,
};
use dispatch_hub::server::DispatchHub;
use dispatch_hub::session::{domain::SessionId, services::DEFAULT_OUTBOX_CAPACITY};
use dispatch_hub::task::{
    adapters::memory::InMemoryTaskRepository,
    domain::{CallerId, TaskId},
};
use dispatch_hub::testing::ManualClock;
use eyre::{WrapErr, bail, ensure, eyre};
use rstest::fixture;
use serde_json::{Value, json};
use tokio::sync::mpsc;

/// Heartbeat timeout used by every harness.
pub const HEARTBEAT_TIMEOUT_SECS: i64 = 30;

/// Hub type under test.
pub type TestHub = DispatchHub<InMemoryAgentRepository, InMemoryTaskRepository, ManualClock>;

/// One connected session and the frames routed to it.
pub struct Peer {
    pub session_id: SessionId,
    inbox: mpsc::Receiver<Arc<str>>,
}

impl Peer {
    /// Pops the next queued frame as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if no frame is queued or it is not JSON.
    pub fn next_event(&mut self) -> Result<Value, eyre::Report> {
        let frame = self
            .inbox
            .try_recv()
            .map_err(|err| eyre!("no frame queued for {}: {err}", self.session_id))?;
        serde_json::from_str(&frame).wrap_err("outbound frame is not JSON")
    }

    /// Pops the next frame, checks its type and returns its payload.
    ///
    /// # Errors
    ///
    /// Returns an error if no frame is queued or it has another type.
    pub fn expect_event(&mut self, kind: &str) -> Result<Value, eyre::Report> {
        let event = self.next_event()?;
        ensure!(
            event["type"] == kind,
            "expected {kind} event, got {event}"
        );
        Ok(event["payload"].clone())
    }

    /// Pops the next raw frame text.
    ///
    /// # Errors
    ///
    /// Returns an error if no frame is queued.
    pub fn next_frame(&mut self) -> Result<String, eyre::Report> {
        self.inbox
            .try_recv()
            .map(|frame| frame.to_string())
            .map_err(|err| eyre!("no frame queued for {}: {err}", self.session_id))
    }

    /// Fails if any frame is queued.
    ///
    /// # Errors
    ///
    /// Returns an error naming the unexpected frame.
    pub fn expect_quiet(&mut self) -> Result<(), eyre::Report> {
        if let Ok(frame) = self.inbox.try_recv() {
            bail!("expected no frames for {}, got {frame}", self.session_id);
        }
        Ok(())
    }
}

/// A hub over in-memory stores and a manual clock.
pub struct HubHarness {
    pub hub: TestHub,
    pub clock: ManualClock,
}

/// Provides a fresh hub with a 30 second heartbeat timeout.
#[fixture]
pub fn harness() -> HubHarness {
    let clock = ManualClock::at_epoch();
    let hub = DispatchHub::new(
        Arc::new(InMemoryAgentRepository::new()),
        Arc::new(InMemoryTaskRepository::new()),
        Arc::new(clock.clone()),
        LivenessPolicy::new(Duration::from_secs(HEARTBEAT_TIMEOUT_SECS.unsigned_abs())),
    );
    HubHarness { hub, clock }
}

impl HubHarness {
    /// Opens a session, leaving its `connected` greeting queued.
    pub fn connect(&self) -> Peer {
        let (outbox, inbox) = mpsc::channel(DEFAULT_OUTBOX_CAPACITY);
        let session_id = SessionId::new();
        self.hub
            .router()
            .deliver(self.hub.engine().connect(session_id, outbox));
        Peer { session_id, inbox }
    }

    /// Opens a session and consumes its greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if the greeting is missing.
    pub fn connect_greeted(&self) -> Result<Peer, eyre::Report> {
        let mut peer = self.connect();
        peer.expect_event("connected")?;
        Ok(peer)
    }

    /// Sends a raw text frame from `peer` and routes the results.
    pub async fn send_text(&self, peer: &Peer, frame: &str) {
        let deliveries = self.hub.engine().handle_frame(peer.session_id, frame).await;
        self.hub.router().deliver(deliveries);
    }

    /// Sends a JSON frame from `peer` and routes the results.
    pub async fn send(&self, peer: &Peer, frame: &Value) {
        self.send_text(peer, &frame.to_string()).await;
    }

    /// Closes `peer`'s session and routes the results.
    pub async fn disconnect(&self, peer: Peer) {
        let deliveries = self.hub.engine().disconnect(peer.session_id).await;
        self.hub.router().deliver(deliveries);
    }

    /// Connects and registers an agent for `task_type`.
    ///
    /// # Errors
    ///
    /// Returns an error if registration is not acknowledged.
    pub async fn register_agent(&self, task_type: &str) -> Result<(Peer, AgentId), eyre::Report> {
        let mut peer = self.connect_greeted()?;
        let agent_id = AgentId::new();
        self.send(&peer, &register_frame(agent_id, task_type)).await;
        let ack = peer.expect_event("agent_registered")?;
        ensure!(ack["agent_id"] == agent_id.to_string(), "ack names another agent: {ack}");
        Ok((peer, agent_id))
    }

    /// Sends a task request and returns the accepted task.
    ///
    /// # Errors
    ///
    /// Returns an error if the caller does not receive `task_accepted`.
    pub async fn request_task(
        &self,
        caller: &mut Peer,
        caller_id: CallerId,
        task_type: &str,
        input: &str,
    ) -> Result<TaskId, eyre::Report> {
        self.send_text(caller, &request_text(caller_id, task_type, input))
            .await;
        let accepted = caller.expect_event("task_accepted")?;
        task_id_of(&accepted)
    }
}

/// Builds a `register` frame.
#[must_use]
pub fn register_frame(agent_id: AgentId, task_type: &str) -> Value {
    json!({
        "type": "register",
        "payload": {
            "agent_id": agent_id,
            "name": format!("{task_type} solver"),
            "task_type": task_type,
        }
    })
}

/// Builds a `heartbeat` frame.
#[must_use]
pub fn heartbeat_frame(agent_id: AgentId) -> Value {
    json!({"type": "heartbeat", "payload": {"agent_id": agent_id, "status": "active"}})
}

/// Builds a `task_request` frame with `input` spliced in verbatim.
#[must_use]
pub fn request_text(caller_id: CallerId, task_type: &str, input: &str) -> String {
    format!(
        r#"{{"type":"task_request","payload":{{"caller_id":"{caller_id}","task_type":"{task_type}","input":{input}}}}}"#
    )
}

/// Builds a completed `task_result` frame.
#[must_use]
pub fn result_frame(task_id: TaskId, output: &Value) -> Value {
    json!({
        "type": "task_result",
        "payload": {"task_id": task_id, "output": output, "status": "completed"}
    })
}

/// Reads `task_id` from an event payload.
///
/// # Errors
///
/// Returns an error if the field is missing or not a task identifier.
pub fn task_id_of(payload: &Value) -> Result<TaskId, eyre::Report> {
    serde_json::from_value(payload["task_id"].clone()).wrap_err("payload lacks a task_id")
}
