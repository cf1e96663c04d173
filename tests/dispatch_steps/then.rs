//! Then steps for dispatch BDD scenarios.

use super::world::{DispatchWorld, json_arg, run_async, task_id_of};
use dispatch_hub::task::domain::TaskStatus;
use eyre::{ensure, eyre};
use rstest_bdd_macros::then;

#[then(r#"agent "{agent}" is assigned the task with input {input}"#)]
fn agent_is_assigned(
    world: &mut DispatchWorld,
    agent: String,
    input: String,
) -> Result<(), eyre::Report> {
    let assigned = world.agent_peer(&agent)?.expect_event("task_assigned")?;
    ensure!(
        assigned["input"] == json_arg(&input)?,
        "assignment carried {}",
        assigned["input"]
    );
    world.task_id = Some(task_id_of(&assigned)?);
    Ok(())
}

#[then(r#"caller "{caller}" is told the task was accepted by "{agent}""#)]
fn caller_told_accepted(
    world: &mut DispatchWorld,
    caller: String,
    agent: String,
) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    let agent_id = world.agent(&agent)?.agent_id;
    let accepted = world.caller(&caller)?.peer.expect_event("task_accepted")?;
    ensure!(task_id_of(&accepted)? == task_id, "acceptance names another task");
    ensure!(
        accepted["agent_id"] == agent_id.to_string(),
        "acceptance names another agent: {accepted}"
    );
    Ok(())
}

#[then(r#"caller "{caller}" receives the completed task with output {output}"#)]
fn caller_receives_completion(
    world: &mut DispatchWorld,
    caller: String,
    output: String,
) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    let completed = world.caller(&caller)?.peer.expect_event("task_completed")?;
    ensure!(task_id_of(&completed)? == task_id, "completion names another task");
    ensure!(completed["status"] == "completed", "status: {completed}");
    ensure!(
        completed["output"] == json_arg(&output)?,
        "output: {}",
        completed["output"]
    );
    Ok(())
}

#[then(r#"caller "{caller}" receives a rejection with a reason"#)]
fn caller_receives_rejection(world: &mut DispatchWorld, caller: String) -> Result<(), eyre::Report> {
    let rejected = world.caller(&caller)?.peer.expect_event("task_rejected")?;
    ensure!(
        rejected["reason"].as_str().is_some_and(|reason| !reason.is_empty()),
        "rejection without a reason: {rejected}"
    );
    ensure!(
        rejected.get("task_id").is_none(),
        "a task was created for the rejected request: {rejected}"
    );
    Ok(())
}

#[then(r#"caller "{caller}" receives nothing"#)]
fn caller_receives_nothing(world: &mut DispatchWorld, caller: String) -> Result<(), eyre::Report> {
    ensure!(world.caller(&caller)?.peer.is_quiet(), "caller {caller} received a frame");
    Ok(())
}

#[then(r#"agent "{agent}" receives nothing"#)]
fn agent_receives_nothing(world: &mut DispatchWorld, agent: String) -> Result<(), eyre::Report> {
    ensure!(world.agent_peer(&agent)?.is_quiet(), "agent {agent} received a frame");
    Ok(())
}

#[then(r#"the task is stored as "{status}""#)]
fn task_is_stored_as(world: &DispatchWorld, status: String) -> Result<(), eyre::Report> {
    let expected = TaskStatus::try_from(status.as_str())
        .map_err(|err| eyre!("invalid expected status in scenario: {err}"))?;
    let task_id = world.task_id()?;
    let task = run_async(world.hub.engine().tasks().find_by_id(task_id))?
        .ok_or_else(|| eyre!("task {task_id} is not stored"))?;
    ensure!(
        task.status() == expected,
        "expected {}, found {}",
        expected.as_str(),
        task.status().as_str()
    );
    Ok(())
}

#[then(r#"agent "{agent}" is not eligible"#)]
fn agent_is_not_eligible(world: &mut DispatchWorld, agent: String) -> Result<(), eyre::Report> {
    let agent_id = world.agent(&agent)?.agent_id;
    ensure!(
        !run_async(world.hub.engine().directory().is_eligible(agent_id))?,
        "agent {agent} is still eligible"
    );
    Ok(())
}
