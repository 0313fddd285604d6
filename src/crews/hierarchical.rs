//! Manager-driven execution of one task.
//!
//! The manager is invoked with the task and the delegation tools. Each reply
//! either finishes the task or requests one or more delegations. Requests to
//! different coworkers run concurrently; requests to the same coworker run in
//! the order written. Results are fed back to the manager as observations
//! until it gives a final answer or the delegation bound is hit.

use futures::future::join_all;

use super::execution_trace::TraceEntry;
use super::invocation::RunContext;
use crate::agent::core::{Agent, PromptContext};
use crate::agents::parser::{self, ParseResult};
use crate::task::{Task, TaskLifecycle, TaskState};
use crate::tasks::task_output::TaskOutput;
use crate::tools::agent_tools::{AgentTools, DelegationRequest};
use crate::utilities::errors::{CrewError, DelegationDepthExceeded, Result};
use crate::utilities::i18n::fill;

/// One manager action after validation.
enum Step {
    /// Rejected action; the note goes back to the manager.
    Rejected(String),
    Delegate { tool: String, request: DelegationRequest },
}

/// Execute `task` under the manager. Only run-fatal errors are returned;
/// everything else ends as a failed [`TaskOutput`].
pub(crate) async fn execute_task(
    run: &RunContext,
    task: &Task,
    upstream: Option<&str>,
) -> Result<TaskOutput> {
    let manager = run.manager()?;
    let tools = AgentTools::new(&run.prompts.i18n, run.coworker_roles());
    let tool_instructions = run
        .prompts
        .tools_section(&tools.descriptions(), &tools.tool_names());

    let mut lifecycle = TaskLifecycle::new(task.key());
    lifecycle.advance(TaskState::Dispatched)?;

    let mut steps: Vec<String> = Vec::new();
    let mut partial_results: Vec<String> = Vec::new();
    let mut delegated_to: Vec<String> = Vec::new();
    let mut delegations = 0;
    let mut rounds = 0;

    loop {
        let ctx = manager_context(run, task, upstream, &tool_instructions, &steps);
        let reply = match run.invoke(manager, &ctx).await {
            Ok(reply) => reply,
            Err(err) if err.is_run_fatal() => return Err(err),
            Err(err) => return Ok(fail_task(run, task, manager, &mut lifecycle, &err, delegations)),
        };

        let actions = match parser::parse(&reply) {
            Ok(ParseResult::Finish(finish)) => {
                lifecycle.advance(TaskState::Synthesized)?;
                lifecycle.advance(TaskState::Done)?;
                let entry = if delegated_to.is_empty() {
                    TraceEntry::direct(task.id(), manager.role(), finish.output.clone())
                } else {
                    TraceEntry::synthesis(task.id(), manager.role(), delegated_to, finish.output.clone())
                };
                run.trace.record(entry);
                run.remember(&finish.output, &task.key(), manager.role());
                log::info!("Task '{}' completed by manager '{}'", task.key(), manager.role());
                return Ok(TaskOutput::completed(task, manager.role(), finish.output, delegations));
            }
            Ok(ParseResult::Actions(actions)) => actions,
            Err(err) => {
                if let Some(exceeded) = check_depth(run, task, rounds, &partial_results) {
                    return Ok(fail_task(run, task, manager, &mut lifecycle, &exceeded, delegations));
                }
                rounds += 1;
                log::warn!("Manager reply for task '{}' could not be parsed: {}", task.key(), err.error);
                let note = fill(&run.prompts.i18n.errors("format"), &[("error", &err.error)]);
                steps.push(run.prompts.note(&note));
                continue;
            }
        };

        if let Some(exceeded) = check_depth(run, task, rounds, &partial_results) {
            return Ok(fail_task(run, task, manager, &mut lifecycle, &exceeded, delegations));
        }
        rounds += 1;

        let planned: Vec<Step> = actions
            .iter()
            .map(|action| match tools.prepare(action) {
                Ok(request) => Step::Delegate {
                    tool: action.tool.trim().to_string(),
                    request,
                },
                Err(note) => Step::Rejected(note),
            })
            .collect();
        let requests: Vec<&DelegationRequest> = planned
            .iter()
            .filter_map(|step| match step {
                Step::Delegate { request, .. } => Some(request),
                Step::Rejected(_) => None,
            })
            .collect();

        let mut results = if requests.is_empty() {
            Vec::new()
        } else {
            lifecycle.advance(TaskState::Delegated)?;
            log::debug!(
                "Task '{}' round {}: {} delegation(s)",
                task.key(),
                rounds,
                requests.len()
            );
            dispatch(run, &requests).await?
        }
        .into_iter();
        delegations += results.len();

        let mut entries = Vec::new();
        for step in planned {
            match step {
                Step::Rejected(note) => steps.push(run.prompts.note(&note)),
                Step::Delegate { tool, request } => {
                    let Some(result) = results.next() else { break };
                    match result {
                        Ok(text) => {
                            steps.push(run.prompts.observation(&tool, &request.coworker, &text));
                            run.remember(&text, &task.key(), &request.coworker);
                            entries.push(TraceEntry::delegation(
                                task.id(),
                                manager.role(),
                                &request.coworker,
                                text.clone(),
                            ));
                            if !delegated_to.contains(&request.coworker) {
                                delegated_to.push(request.coworker.clone());
                            }
                            partial_results.push(text);
                        }
                        Err(err) => {
                            let note = fill(
                                &run.prompts.i18n.errors("delegation_failed"),
                                &[("coworker", &request.coworker), ("error", &err.to_string())],
                            );
                            steps.push(run.prompts.observation(&tool, &request.coworker, &note));
                            entries.push(TraceEntry::delegation_failed(
                                task.id(),
                                manager.role(),
                                &request.coworker,
                                err.to_string(),
                            ));
                        }
                    }
                }
            }
        }
        run.trace.record_all(entries);

        if lifecycle.state() == TaskState::Delegated {
            lifecycle.advance(TaskState::Collected)?;
        }
    }
}

/// Run `requests`, concurrently across coworkers and in order for each
/// coworker. Results come back in request order.
async fn dispatch(
    run: &RunContext,
    requests: &[&DelegationRequest],
) -> Result<Vec<Result<String>>> {
    let mut groups: Vec<(&Agent, Vec<(usize, &DelegationRequest)>)> = Vec::new();
    for (index, &request) in requests.iter().enumerate() {
        match groups
            .iter_mut()
            .find(|(worker, _)| worker.role() == request.coworker)
        {
            Some((_, queue)) => queue.push((index, request)),
            None => groups.push((run.agent(&request.coworker)?, vec![(index, request)])),
        }
    }

    let runs = groups.into_iter().map(|(worker, queue)| async move {
        let mut done = Vec::with_capacity(queue.len());
        for (index, request) in queue {
            let result = run.invoke(worker, &worker_context(run, request)).await;
            done.push((index, result));
        }
        done
    });
    let mut results: Vec<(usize, Result<String>)> =
        join_all(runs).await.into_iter().flatten().collect();
    results.sort_by_key(|(index, _)| *index);

    results
        .into_iter()
        .map(|(_, result)| match result {
            Err(err) if err.is_run_fatal() => Err(err),
            other => Ok(other),
        })
        .collect()
}

fn manager_context(
    run: &RunContext,
    task: &Task,
    upstream: Option<&str>,
    tool_instructions: &str,
    steps: &[String],
) -> PromptContext {
    let mut ctx = PromptContext::new(task.description(), task.expected_output())
        .with_upstream(upstream.map(str::to_string))
        .with_tool_instructions(tool_instructions);
    if let Some(role) = task.agent().filter(|role| run.coworker_roles().iter().any(|r| r == role)) {
        ctx = ctx.with_note(run.prompts.preferred_coworker(role));
    }
    if let Some(summary) = run.memory_summary() {
        ctx = ctx.with_note(run.prompts.memory_section(&summary));
    }
    if !steps.is_empty() {
        ctx = ctx.with_note(run.prompts.scratchpad(steps));
    }
    ctx.with_note(run.prompts.begin())
}

fn worker_context(run: &RunContext, request: &DelegationRequest) -> PromptContext {
    let context = Some(request.context.clone()).filter(|c| !c.trim().is_empty());
    let ctx = PromptContext::new(request.request.clone(), run.prompts.manager_request())
        .with_upstream(context);
    match run.memory_summary() {
        Some(summary) => ctx.with_note(run.prompts.memory_section(&summary)),
        None => ctx,
    }
}

fn check_depth(
    run: &RunContext,
    task: &Task,
    rounds: usize,
    partial_results: &[String],
) -> Option<CrewError> {
    (rounds >= run.max_delegation_depth).then(|| {
        log::warn!(
            "Task '{}' hit the delegation bound of {} rounds",
            task.key(),
            run.max_delegation_depth
        );
        CrewError::from(DelegationDepthExceeded {
            task: task.key(),
            bound: run.max_delegation_depth,
            partial_results: partial_results.to_vec(),
        })
    })
}

fn fail_task(
    run: &RunContext,
    task: &Task,
    manager: &Agent,
    lifecycle: &mut TaskLifecycle,
    err: &CrewError,
    delegations: usize,
) -> TaskOutput {
    lifecycle.fail();
    let mut reason = err.to_string();
    if let CrewError::DelegationDepthExceeded(exceeded) = err {
        if !exceeded.partial_results.is_empty() {
            reason.push_str("\n\nPartial results:");
            for result in &exceeded.partial_results {
                reason.push_str("\n- ");
                reason.push_str(result);
            }
        }
    }
    log::error!("Task '{}' failed: {}", task.key(), err);
    run.trace
        .record(TraceEntry::task_failed(task.id(), manager.role(), reason));
    TaskOutput::failed(task, manager.role(), err.to_string(), delegations)
}
