//! Direct execution of one task by its assigned agent.

use super::execution_trace::TraceEntry;
use super::invocation::RunContext;
use crate::agent::core::PromptContext;
use crate::task::{Task, TaskLifecycle, TaskState};
use crate::tasks::task_output::TaskOutput;
use crate::utilities::errors::{CrewError, Result};

/// Execute `task` on its assigned agent. Only run-fatal errors are returned.
pub(crate) async fn execute_task(
    run: &RunContext,
    task: &Task,
    upstream: Option<&str>,
) -> Result<TaskOutput> {
    let role = task.agent().ok_or_else(|| {
        CrewError::configuration(format!("task '{}' has no assigned agent", task.key()))
    })?;
    let agent = run.agent(role)?;

    let mut lifecycle = TaskLifecycle::new(task.key());
    lifecycle.advance(TaskState::Dispatched)?;

    let mut ctx = PromptContext::new(task.description(), task.expected_output())
        .with_upstream(upstream.map(str::to_string));
    if let Some(summary) = run.memory_summary() {
        ctx = ctx.with_note(run.prompts.memory_section(&summary));
    }

    match run.invoke(agent, &ctx).await {
        Ok(raw) => {
            lifecycle.advance(TaskState::Synthesized)?;
            lifecycle.advance(TaskState::Done)?;
            run.trace
                .record(TraceEntry::direct(task.id(), agent.role(), raw.clone()));
            run.remember(&raw, &task.key(), agent.role());
            log::info!("Task '{}' completed by '{}'", task.key(), agent.role());
            Ok(TaskOutput::completed(task, agent.role(), raw, 0))
        }
        Err(err) if err.is_run_fatal() => Err(err),
        Err(err) => {
            lifecycle.fail();
            log::error!("Task '{}' failed: {}", task.key(), err);
            run.trace
                .record(TraceEntry::task_failed(task.id(), agent.role(), err.to_string()));
            Ok(TaskOutput::failed(task, agent.role(), err.to_string(), 0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    use crate::agent::core::Agent;
    use crate::crew::CrewOptions;
    use crate::crews::execution_trace::TraceKind;
    use crate::llms::mock::MockLLM;
    use crate::utilities::errors::BackendError;
    use crate::utilities::prompts::Prompts;

    fn run_with(llm: MockLLM) -> RunContext {
        RunContext::new(
            vec![Agent::new("Writer", "Write", "Writes.", Box::new(llm))],
            None,
            &CrewOptions::default(),
            Prompts::default(),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_assigned_agent_answers() {
        let run = run_with(MockLLM::responder(|messages| {
            let prompt = &messages[1].content;
            Ok(if prompt.contains("the outline") {
                "draft from outline".to_string()
            } else {
                "draft".to_string()
            })
        }));
        let task = Task::new("Write", "A draft").with_agent("Writer");
        let output = execute_task(&run, &task, Some("the outline")).await.unwrap();
        assert_eq!(output.raw, "draft from outline");
        assert_eq!(output.agent, "Writer");
        assert_eq!(run.trace.snapshot().count(TraceKind::Direct), 1);
    }

    #[tokio::test]
    async fn test_backend_error_fails_task_only() {
        let run = run_with(MockLLM::scripted(vec![Err(BackendError::Http {
            provider: "Mock".into(),
            status: 404,
            message: "no such model".into(),
        })]));
        let task = Task::new("Write", "A draft").with_agent("Writer");
        let output = execute_task(&run, &task, None).await.unwrap();
        assert_eq!(output.state, TaskState::Failed);
        assert!(output.error.unwrap().contains("no such model"));
        assert_eq!(run.trace.snapshot().count(TraceKind::TaskFailed), 1);
    }
}
