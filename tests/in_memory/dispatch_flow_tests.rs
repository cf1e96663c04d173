//! Request, assignment and result round trips through the engine and router.

use super::helpers::{
    HubHarness, harness, request_text, result_frame, task_id_of,
};
use dispatch_hub::task::domain::{CallerId, TaskStatus};
use eyre::{ensure, eyre};
use rstest::rstest;
use serde_json::json;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn math_request_round_trips_to_the_caller(harness: HubHarness) -> Result<(), eyre::Report> {
    let (mut agent, agent_id) = harness.register_agent("math").await?;
    let mut caller = harness.connect_greeted()?;
    let caller_id = CallerId::new();

    let task_id = harness
        .request_task(&mut caller, caller_id, "math", r#"{"q":"2+2"}"#)
        .await?;

    let assigned = agent.expect_event("task_assigned")?;
    ensure!(task_id_of(&assigned)? == task_id, "assignment names another task");
    ensure!(assigned["input"] == json!({"q": "2+2"}), "input changed: {assigned}");
    ensure!(assigned["caller_id"] == caller_id.to_string(), "caller missing: {assigned}");

    harness
        .send(&agent, &result_frame(task_id, &json!({"a": 4})))
        .await;

    let completed = caller.expect_event("task_completed")?;
    ensure!(task_id_of(&completed)? == task_id, "completion names another task");
    ensure!(completed["status"] == "completed", "status: {completed}");
    ensure!(completed["output"] == json!({"a": 4}), "output: {completed}");
    ensure!(!completed["completed_at"].is_null(), "completed_at missing");
    agent.expect_quiet()?;

    let stored = harness
        .hub
        .engine()
        .tasks()
        .find_by_id(task_id)
        .await?
        .ok_or_else(|| eyre!("task {task_id} not stored"))?;
    ensure!(stored.status() == TaskStatus::Completed, "stored status");
    ensure!(stored.agent_id() == agent_id, "stored agent");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn assigned_input_is_byte_equal_to_the_request(
    harness: HubHarness,
) -> Result<(), eyre::Report> {
    let (mut agent, _) = harness.register_agent("math").await?;
    let mut caller = harness.connect_greeted()?;
    let input = r#"{ "q" : "2+2",  "precision": 1.50, "tags": [ ] }"#;

    harness
        .request_task(&mut caller, CallerId::new(), "math", input)
        .await?;

    let frame = agent.next_frame()?;
    ensure!(
        frame.contains(&format!(r#""input":{input}"#)),
        "input was re-encoded: {frame}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unmatched_request_is_rejected_without_a_task(
    harness: HubHarness,
) -> Result<(), eyre::Report> {
    let (mut agent, _) = harness.register_agent("math").await?;
    let mut caller = harness.connect_greeted()?;

    harness
        .send_text(
            &caller,
            &request_text(CallerId::new(), "unknown_type", r#"{"q":"?"}"#),
        )
        .await;

    let rejected = caller.expect_event("task_rejected")?;
    ensure!(rejected["task_type"] == "unknown_type", "task type: {rejected}");
    ensure!(
        rejected["reason"].as_str().is_some_and(|reason| !reason.is_empty()),
        "reason missing: {rejected}"
    );
    ensure!(rejected.get("task_id").is_none(), "no task may be created: {rejected}");
    caller.expect_quiet()?;
    agent.expect_quiet()?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn duplicate_result_is_suppressed(harness: HubHarness) -> Result<(), eyre::Report> {
    let (mut agent, _) = harness.register_agent("math").await?;
    let mut caller = harness.connect_greeted()?;
    let task_id = harness
        .request_task(&mut caller, CallerId::new(), "math", r#"{"q":"2+2"}"#)
        .await?;
    agent.expect_event("task_assigned")?;

    harness
        .send(&agent, &result_frame(task_id, &json!({"a": 4})))
        .await;
    caller.expect_event("task_completed")?;
    harness
        .send(&agent, &result_frame(task_id, &json!({"a": 5})))
        .await;

    caller.expect_quiet()?;
    agent.expect_quiet()?;
    let stored = harness
        .hub
        .engine()
        .tasks()
        .find_by_id(task_id)
        .await?
        .ok_or_else(|| eyre!("task {task_id} not stored"))?;
    ensure!(
        stored.output().map(|output| output.as_str()) == Some(r#"{"a":4}"#),
        "second result overwrote the first: {:?}",
        stored.output()
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_result_carries_the_error(harness: HubHarness) -> Result<(), eyre::Report> {
    let (agent, _) = harness.register_agent("math").await?;
    let mut caller = harness.connect_greeted()?;
    let task_id = harness
        .request_task(&mut caller, CallerId::new(), "math", r#"{"q":"1/0"}"#)
        .await?;

    harness
        .send(
            &agent,
            &json!({
                "type": "task_result",
                "payload": {"task_id": task_id, "status": "failed", "error_message": "division by zero"}
            }),
        )
        .await;

    let completed = caller.expect_event("task_completed")?;
    ensure!(completed["status"] == "failed", "status: {completed}");
    ensure!(completed["error"] == "division by zero", "error: {completed}");
    ensure!(completed["output"].is_null(), "output: {completed}");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn legacy_field_names_are_accepted(harness: HubHarness) -> Result<(), eyre::Report> {
    let mut agent = harness.connect_greeted()?;
    let agent_id = dispatch_hub::agent::domain::AgentId::new();
    harness
        .send(
            &agent,
            &json!({
                "type": "agent_register",
                "payload": {"agent_id": agent_id, "agent_name": "Solver", "agent_type": "math"}
            }),
        )
        .await;
    agent.expect_event("agent_registered")?;

    let mut caller = harness.connect_greeted()?;
    let caller_id = CallerId::new();
    harness
        .send(
            &caller,
            &json!({
                "type": "task_request",
                "payload": {"user_id": caller_id, "task_type": "math", "input_data": {"q": "3*3"}}
            }),
        )
        .await;
    let accepted = caller.expect_event("task_accepted")?;
    ensure!(accepted["agent_name"] == "Solver", "agent name: {accepted}");
    ensure!(
        agent.expect_event("task_assigned")?["input"] == json!({"q": "3*3"}),
        "assignment input"
    );
    Ok(())
}

#[rstest]
#[case::not_json("{not json")]
#[case::unknown_type(r#"{"type":"subscribe","payload":{}}"#)]
#[case::missing_type(r#"{"payload":{}}"#)]
#[case::missing_field(r#"{"type":"task_request","payload":{"task_type":"math","input":{}}}"#)]
#[case::null_input(r#"{"type":"task_request","payload":{"caller_id":"6f0c2a4e-1d7b-4c8e-9a3f-2b5d6e7f8a90","task_type":"math","input":null}}"#)]
#[case::bad_uuid(r#"{"type":"heartbeat","payload":{"agent_id":"agent-1"}}"#)]
#[tokio::test(flavor = "multi_thread")]
async fn malformed_frames_only_answer_the_sender(
    harness: HubHarness,
    #[case] frame: &str,
) -> Result<(), eyre::Report> {
    let (mut agent, _) = harness.register_agent("math").await?;
    let mut sender = harness.connect_greeted()?;

    harness.send_text(&sender, frame).await;

    let error = sender.expect_event("error")?;
    ensure!(error["code"] == "validation_error", "code: {error}");
    agent.expect_quiet()?;

    harness
        .request_task(&mut sender, CallerId::new(), "math", r#"{"q":"1+1"}"#)
        .await?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn result_for_unknown_task_reports_unknown_task(
    harness: HubHarness,
) -> Result<(), eyre::Report> {
    let (mut agent, _) = harness.register_agent("math").await?;

    harness
        .send(
            &agent,
            &result_frame(dispatch_hub::task::domain::TaskId::new(), &json!({})),
        )
        .await;

    let error = agent.expect_event("error")?;
    ensure!(error["code"] == "unknown_task", "code: {error}");
    Ok(())
}
