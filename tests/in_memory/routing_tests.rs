//! Direct sends and broadcast groups exposed to collaborators.

use super::helpers::{HubHarness, harness};
use chrono::Utc;
use dispatch_hub::agent::domain::{AgentId, TaskType};
use dispatch_hub::protocol::{OutboundEvent, events::HeartbeatRequest};
use dispatch_hub::session::domain::Identity;
use dispatch_hub::task::domain::CallerId;
use eyre::ensure;
use rstest::rstest;

fn heartbeat_request() -> OutboundEvent {
    OutboundEvent::HeartbeatRequest(HeartbeatRequest {
        timestamp: Utc::now(),
    })
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn agent_broadcast_can_target_one_task_type(
    harness: HubHarness,
) -> Result<(), eyre::Report> {
    let (mut math, _) = harness.register_agent("math").await?;
    let (mut poetry, _) = harness.register_agent("poetry").await?;
    let mut caller = harness.connect_greeted()?;
    let math_type = TaskType::new("math")?;

    let reached = harness
        .hub
        .router()
        .broadcast_to_agents(&heartbeat_request(), Some(&math_type));

    ensure!(reached == 1, "reached {reached} sessions");
    math.expect_event("heartbeat_request")?;
    poetry.expect_quiet()?;
    caller.expect_quiet()?;

    ensure!(harness.hub.router().broadcast_to_agents(&heartbeat_request(), None) == 2);
    math.expect_event("heartbeat_request")?;
    poetry.expect_event("heartbeat_request")?;
    caller.expect_quiet()?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn direct_sends_report_connectivity(harness: HubHarness) -> Result<(), eyre::Report> {
    let (mut agent, agent_id) = harness.register_agent("math").await?;
    let router = harness.hub.router();

    ensure!(router.send_to_agent(agent_id, &heartbeat_request()), "connected agent unreachable");
    agent.expect_event("heartbeat_request")?;
    ensure!(
        !router.send_to_agent(AgentId::new(), &heartbeat_request()),
        "unknown agent reported as reached"
    );

    harness.disconnect(agent).await;
    ensure!(
        !router.send_to_agent(agent_id, &heartbeat_request()),
        "disconnected agent reported as reached"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn callers_join_their_group_on_first_request(
    harness: HubHarness,
) -> Result<(), eyre::Report> {
    let mut caller = harness.connect_greeted()?;
    let caller_id = CallerId::new();

    ensure!(harness.hub.router().broadcast_to_callers(&heartbeat_request()) == 0);
    ensure!(!harness.hub.router().send_to_caller(caller_id, &heartbeat_request()));

    harness
        .send_text(
            &caller,
            &super::helpers::request_text(caller_id, "math", "{}"),
        )
        .await;
    caller.expect_event("task_rejected")?;

    ensure!(harness.hub.router().broadcast_to_callers(&heartbeat_request()) == 1);
    caller.expect_event("heartbeat_request")?;
    ensure!(harness.hub.router().send_to_caller(caller_id, &heartbeat_request()));
    caller.expect_event("heartbeat_request")?;
    ensure!(
        harness.hub.engine().registry().is_connected(Identity::Caller(caller_id)),
        "caller not indexed"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn connected_agents_track_sessions(harness: HubHarness) -> Result<(), eyre::Report> {
    let (first, first_id) = harness.register_agent("math").await?;
    let (_second, second_id) = harness.register_agent("math").await?;

    let mut expected = vec![first_id, second_id];
    expected.sort();
    ensure!(harness.hub.engine().registry().connected_agents() == expected);

    harness.disconnect(first).await;
    ensure!(harness.hub.engine().registry().connected_agents() == vec![second_id]);
    Ok(())
}
