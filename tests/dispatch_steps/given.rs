//! Given steps for dispatch BDD scenarios.

use super::world::{AgentHandle, DispatchWorld, request_frame, task_id_of};
use dispatch_hub::agent::domain::AgentId;
use eyre::ensure;
use rstest_bdd_macros::given;
use serde_json::json;

#[given(r#"agent "{name}" is registered for "{task_type}""#)]
fn agent_registered(
    world: &mut DispatchWorld,
    name: String,
    task_type: String,
) -> Result<(), eyre::Report> {
    let mut peer = world.connect()?;
    let agent_id = AgentId::new();
    let frame = json!({
        "type": "register",
        "payload": {"agent_id": agent_id, "name": name, "task_type": task_type}
    });
    world.send(peer.session_id, &frame.to_string());
    peer.expect_event("agent_registered")?;
    world.agents.insert(
        name,
        AgentHandle {
            agent_id,
            peer: Some(peer),
        },
    );
    Ok(())
}

#[given(r#"caller "{caller}" has a "{task_type}" task assigned to "{agent}""#)]
fn caller_has_assigned_task(
    world: &mut DispatchWorld,
    caller: String,
    task_type: String,
    agent: String,
) -> Result<(), eyre::Report> {
    let handle = world.caller(&caller)?;
    let (session_id, caller_id) = (handle.peer.session_id, handle.caller_id);
    world.send(session_id, &request_frame(caller_id, &task_type, r#"{"q":"2+2"}"#));

    let accepted = world.caller(&caller)?.peer.expect_event("task_accepted")?;
    let assigned = world.agent_peer(&agent)?.expect_event("task_assigned")?;
    let task_id = task_id_of(&accepted)?;
    ensure!(task_id_of(&assigned)? == task_id, "assignment names another task");
    world.task_id = Some(task_id);
    Ok(())
}
