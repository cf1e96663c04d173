//! Disconnects, heartbeats and the liveness sweep.

use super::helpers::{
    HEARTBEAT_TIMEOUT_SECS, HubHarness, harness, heartbeat_frame, register_frame, request_text,
};
use dispatch_hub::session::domain::Identity;
use dispatch_hub::task::domain::{CallerId, TaskStatus};
use eyre::{ensure, eyre};
use rstest::rstest;

const TIMEOUT_SECS: i64 = HEARTBEAT_TIMEOUT_SECS;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn disconnect_makes_the_agent_ineligible(harness: HubHarness) -> Result<(), eyre::Report> {
    let (agent, agent_id) = harness.register_agent("math").await?;
    let mut caller = harness.connect_greeted()?;
    harness
        .request_task(&mut caller, CallerId::new(), "math", r#"{"q":"1"}"#)
        .await?;

    harness.disconnect(agent).await;

    let unavailable = caller.expect_event("agent_unavailable")?;
    ensure!(unavailable["agent_id"] == agent_id.to_string(), "{unavailable}");
    ensure!(
        !harness.hub.engine().directory().is_eligible(agent_id).await?,
        "disconnected agent is still eligible"
    );
    harness
        .send_text(&caller, &request_text(CallerId::new(), "math", "{}"))
        .await;
    caller.expect_event("task_rejected")?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn silent_agent_expires_on_the_next_sweep(harness: HubHarness) -> Result<(), eyre::Report> {
    let (mut agent, agent_id) = harness.register_agent("math").await?;
    let mut caller = harness.connect_greeted()?;
    let caller_id = CallerId::new();
    harness
        .request_task(&mut caller, caller_id, "math", r#"{"q":"1"}"#)
        .await?;
    agent.expect_event("task_assigned")?;

    harness.clock.advance_secs(TIMEOUT_SECS - 1);
    harness.hub.sweep_once().await;
    agent.expect_event("heartbeat_request")?;
    caller.expect_quiet()?;
    ensure!(
        harness.hub.engine().directory().is_eligible(agent_id).await?,
        "agent expired early"
    );

    harness.clock.advance_secs(1);
    ensure!(
        !harness.hub.engine().directory().is_eligible(agent_id).await?,
        "timed-out agent is still eligible"
    );
    harness.hub.sweep_once().await;

    let unavailable = caller.expect_event("agent_unavailable")?;
    ensure!(unavailable["agent_id"] == agent_id.to_string(), "{unavailable}");
    agent.expect_event("heartbeat_request")?;
    harness
        .send_text(&caller, &request_text(caller_id, "math", "{}"))
        .await;
    caller.expect_event("task_rejected")?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn heartbeat_keeps_and_restores_eligibility(
    harness: HubHarness,
) -> Result<(), eyre::Report> {
    let (mut agent, agent_id) = harness.register_agent("math").await?;

    harness.clock.advance_secs(TIMEOUT_SECS - 5);
    harness.send(&agent, &heartbeat_frame(agent_id)).await;
    let ack = agent.expect_event("heartbeat_ack")?;
    ensure!(ack["status"] == "active", "{ack}");

    harness.clock.advance_secs(TIMEOUT_SECS - 5);
    ensure!(
        harness.hub.engine().directory().is_eligible(agent_id).await?,
        "heartbeat did not refresh liveness"
    );

    harness.clock.advance_secs(TIMEOUT_SECS);
    harness.hub.sweep_once().await;
    agent.expect_event("heartbeat_request")?;
    harness.send(&agent, &heartbeat_frame(agent_id)).await;
    agent.expect_event("heartbeat_ack")?;
    ensure!(
        harness.hub.engine().directory().is_eligible(agent_id).await?,
        "heartbeat did not reactivate the swept agent"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn heartbeat_from_unknown_agent_is_an_error(
    harness: HubHarness,
) -> Result<(), eyre::Report> {
    let mut peer = harness.connect_greeted()?;

    harness
        .send(&peer, &heartbeat_frame(dispatch_hub::agent::domain::AgentId::new()))
        .await;

    let error = peer.expect_event("error")?;
    ensure!(error["code"] == "unknown_agent", "{error}");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn assigned_task_survives_agent_disconnect(harness: HubHarness) -> Result<(), eyre::Report> {
    let (agent, _) = harness.register_agent("math").await?;
    let mut caller = harness.connect_greeted()?;
    let task_id = harness
        .request_task(&mut caller, CallerId::new(), "math", r#"{"q":"2+2"}"#)
        .await?;

    harness.disconnect(agent).await;
    harness.clock.advance_secs(TIMEOUT_SECS * 10);
    harness.hub.sweep_once().await;

    let task = harness
        .hub
        .engine()
        .tasks()
        .find_by_id(task_id)
        .await?
        .ok_or_else(|| eyre!("task {task_id} vanished"))?;
    ensure!(task.status() == TaskStatus::Assigned, "task was requeued or closed");
    caller.expect_event("agent_unavailable")?;
    caller.expect_quiet()?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stale_session_close_keeps_a_reconnected_agent(
    harness: HubHarness,
) -> Result<(), eyre::Report> {
    let (old_session, agent_id) = harness.register_agent("math").await?;
    let mut caller = harness.connect_greeted()?;
    harness
        .request_task(&mut caller, CallerId::new(), "math", "{}")
        .await?;

    let mut new_session = harness.connect_greeted()?;
    harness
        .send(&new_session, &register_frame(agent_id, "math"))
        .await;
    new_session.expect_event("agent_registered")?;
    caller.expect_event("agent_available")?;

    harness.disconnect(old_session).await;

    caller.expect_quiet()?;
    ensure!(
        harness.hub.engine().registry().lookup(Identity::Agent(agent_id))
            == Some(new_session.session_id),
        "index does not point at the new session"
    );
    ensure!(
        harness.hub.engine().directory().is_eligible(agent_id).await?,
        "reconnected agent was deactivated"
    );
    Ok(())
}
