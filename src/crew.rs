//! Crew: a set of agents, the tasks they work on and the process that runs
//! them.
//!
//! Construction validates the whole definition, so a [`Crew`] that exists can
//! only fail at run time through backend errors, the delegation bound or
//! cancellation.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::agent::core::Agent;
use crate::crews::crew_output::{CrewOutput, FailureKind, RunFailure, RunOutcome};
use crate::crews::definition::RunRequest;
use crate::crews::invocation::RunContext;
use crate::crews::{hierarchical, sequential};
use crate::llms::registry::ProviderRegistry;
use crate::memory::short_term::DEFAULT_MAX_ENTRIES;
use crate::process::Process;
use crate::task::Task;
use crate::tasks::task_output::TaskOutput;
use crate::utilities::errors::{CrewError, Result};
use crate::utilities::i18n::I18N;
use crate::utilities::prompts::Prompts;

/// Default bound on manager delegation rounds per task.
pub const DEFAULT_MAX_DELEGATION_DEPTH: usize = 8;
/// Default number of retries after a retryable backend error.
pub const DEFAULT_MAX_RETRIES: u32 = 2;
/// Default delay before the first retry; doubled for each further retry.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 1000;

fn default_true() -> bool {
    true
}

fn default_max_delegation_depth() -> usize {
    DEFAULT_MAX_DELEGATION_DEPTH
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_retry_backoff_ms() -> u64 {
    DEFAULT_RETRY_BACKOFF_MS
}

fn default_memory_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

/// Run-wide knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewOptions {
    /// Share a summary of earlier results with later invocations.
    #[serde(default = "default_true")]
    pub memory: bool,
    /// Reuse answers for identical prompts within the run.
    #[serde(default = "default_true")]
    pub cache: bool,
    /// Backend calls allowed per minute, across all agents.
    #[serde(default, alias = "max_calls_per_minute")]
    pub max_rpm: Option<u32>,
    #[serde(default = "default_max_delegation_depth")]
    pub max_delegation_depth: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_memory_max_entries")]
    pub memory_max_entries: usize,
    /// JSON file replacing the embedded prompt text.
    #[serde(default)]
    pub prompt_file: Option<PathBuf>,
}

impl Default for CrewOptions {
    fn default() -> Self {
        Self {
            memory: true,
            cache: true,
            max_rpm: None,
            max_delegation_depth: DEFAULT_MAX_DELEGATION_DEPTH,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            memory_max_entries: DEFAULT_MAX_ENTRIES,
            prompt_file: None,
        }
    }
}

/// A validated crew, ready to run once.
#[derive(Debug)]
pub struct Crew {
    id: Uuid,
    agents: Vec<Agent>,
    tasks: Vec<Task>,
    process: Process,
    manager_role: Option<String>,
    options: CrewOptions,
    prompts: Prompts,
}

impl Crew {
    /// Validate and assemble a crew.
    ///
    /// Fails with [`CrewError::Configuration`] on duplicate roles, dangling
    /// role or task references, or a manager that may not delegate.
    pub fn new(
        agents: Vec<Agent>,
        tasks: Vec<Task>,
        process: Process,
        manager_role: Option<&str>,
        options: CrewOptions,
    ) -> Result<Self> {
        if agents.is_empty() {
            return Err(CrewError::configuration("a crew needs at least one agent"));
        }
        if tasks.is_empty() {
            return Err(CrewError::configuration("a crew needs at least one task"));
        }

        let mut roles = HashSet::new();
        for agent in &agents {
            if !roles.insert(agent.role()) {
                return Err(CrewError::configuration(format!(
                    "duplicate agent role '{}'",
                    agent.role()
                )));
            }
        }

        if let Some(role) = manager_role {
            if !roles.contains(role) {
                return Err(CrewError::configuration(format!(
                    "manager role '{}' does not match any agent",
                    role
                )));
            }
        }
        if process == Process::Hierarchical {
            let role = manager_role.ok_or_else(|| {
                CrewError::configuration("the hierarchical process requires a manager role")
            })?;
            let manager = agents.iter().find(|a| a.role() == role);
            if !manager.is_some_and(Agent::allow_delegation) {
                return Err(CrewError::configuration(format!(
                    "manager '{}' must allow delegation",
                    role
                )));
            }
            if agents.len() < 2 {
                return Err(CrewError::configuration(format!(
                    "manager '{}' has no coworkers to delegate to",
                    role
                )));
            }
        }

        let mut names: HashMap<&str, &Task> = HashMap::new();
        for task in &tasks {
            match task.agent() {
                Some(role) if !roles.contains(role) => {
                    return Err(CrewError::configuration(format!(
                        "task '{}' is assigned to unknown agent '{}'",
                        task.key(),
                        role
                    )));
                }
                None if process == Process::Sequential => {
                    return Err(CrewError::configuration(format!(
                        "task '{}' needs an assigned agent under the sequential process",
                        task.key()
                    )));
                }
                _ => {}
            }
            if let Some(dependency) = task.depends_on() {
                match names.get(dependency) {
                    None => {
                        return Err(CrewError::configuration(format!(
                            "task '{}' depends on '{}', which is not an earlier task",
                            task.key(),
                            dependency
                        )));
                    }
                    Some(earlier) if earlier.is_fire_and_forget() => {
                        return Err(CrewError::configuration(format!(
                            "task '{}' depends on fire-and-forget task '{}'",
                            task.key(),
                            dependency
                        )));
                    }
                    Some(_) => {}
                }
            }
            if let Some(name) = task.name() {
                if names.insert(name, task).is_some() {
                    return Err(CrewError::configuration(format!("duplicate task name '{}'", name)));
                }
            }
        }

        if options.max_delegation_depth == 0 {
            return Err(CrewError::configuration("max_delegation_depth must be at least 1"));
        }
        let prompts = match &options.prompt_file {
            Some(path) => Prompts::new(
                I18N::from_file(path).map_err(|e| CrewError::configuration(format!("{:#}", e)))?,
            ),
            None => Prompts::default(),
        };

        Ok(Self {
            id: Uuid::new_v4(),
            agents,
            tasks,
            process,
            manager_role: manager_role.map(str::to_string),
            options,
            prompts,
        })
    }

    /// Resolve every agent's backend and build the crew.
    pub fn from_request(request: &RunRequest, registry: &ProviderRegistry) -> Result<Self> {
        let agents = request
            .agents
            .iter()
            .map(|config| config.build(registry))
            .collect::<Result<Vec<_>>>()?;
        let tasks = request
            .tasks
            .iter()
            .cloned()
            .map(|config| config.into_task())
            .collect();
        Self::new(
            agents,
            tasks,
            request.process,
            request.manager_role.as_deref(),
            request.options.clone(),
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn process(&self) -> Process {
        self.process
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Run every task and collect the result.
    ///
    /// Synchronous tasks run in declared order; a fire-and-forget task is
    /// started in place and joined before the run ends. Cancelling `cancel`,
    /// or dropping the returned future, stops all outstanding work.
    pub async fn kickoff(
        self,
        inputs: &HashMap<String, String>,
        cancel: CancellationToken,
    ) -> std::result::Result<CrewOutput, RunFailure> {
        let Crew {
            id,
            agents,
            tasks,
            process,
            manager_role,
            options,
            prompts,
        } = self;
        let agents = agents
            .into_iter()
            .map(|agent| agent.interpolate_inputs(inputs))
            .collect();
        let tasks: Vec<Task> = tasks
            .into_iter()
            .map(|task| task.interpolate_inputs(inputs))
            .collect();

        log::info!(
            "Crew {} starting: {} process, {} task(s)",
            id,
            process,
            tasks.len()
        );
        let run = Arc::new(RunContext::new(
            agents,
            manager_role,
            &options,
            prompts,
            cancel.child_token(),
        ));
        // dropping this future stops background tasks too
        let _cancel_on_drop = run.cancel.clone().drop_guard();

        let names: HashMap<&str, usize> = tasks
            .iter()
            .enumerate()
            .filter_map(|(index, task)| task.name().map(|name| (name, index)))
            .collect();
        let mut outputs: Vec<Option<TaskOutput>> = vec![None; tasks.len()];
        let mut background: Vec<(usize, JoinHandle<Result<TaskOutput>>)> = Vec::new();
        let mut fatal: Option<CrewError> = None;

        for (index, task) in tasks.iter().enumerate() {
            let upstream = task
                .depends_on()
                .and_then(|name| names.get(name))
                .and_then(|&earlier| outputs[earlier].as_ref())
                .filter(|output| output.is_done())
                .map(|output| output.raw.clone());

            if task.is_fire_and_forget() {
                log::debug!("Starting fire-and-forget task '{}'", task.key());
                let run = Arc::clone(&run);
                let task = task.clone();
                background.push((
                    index,
                    tokio::spawn(async move {
                        execute_task(&run, process, &task, upstream.as_deref()).await
                    }),
                ));
                continue;
            }

            match execute_task(&run, process, task, upstream.as_deref()).await {
                Ok(output) => outputs[index] = Some(output),
                Err(err) => {
                    fatal = Some(err);
                    break;
                }
            }
        }

        if fatal.is_some() {
            run.cancel.cancel();
        }
        for (index, handle) in background {
            match handle.await {
                Ok(Ok(output)) => outputs[index] = Some(output),
                Ok(Err(err)) => {
                    run.cancel.cancel();
                    fatal.get_or_insert(err);
                }
                Err(join_err) => {
                    run.cancel.cancel();
                    fatal.get_or_insert(CrewError::Other(anyhow::anyhow!(
                        "fire-and-forget task '{}' did not finish: {}",
                        tasks[index].key(),
                        join_err
                    )));
                }
            }
        }

        let trace = run.trace.snapshot();
        let final_output = tasks
            .iter()
            .zip(&outputs)
            .rev()
            .filter(|(task, _)| !task.is_fire_and_forget())
            .find_map(|(_, output)| output.as_ref().filter(|o| o.is_done()))
            .map(|output| output.raw.clone());
        let tasks_output: Vec<TaskOutput> = outputs.into_iter().flatten().collect();

        if let Some(err) = fatal {
            log::error!("Crew {} failed: {}", id, err);
            return Err(RunFailure::from_error(&err).with_trace(trace, tasks_output));
        }
        let Some(raw) = final_output else {
            log::error!("Crew {} finished without a completed synchronous task", id);
            return Err(RunFailure::new(
                FailureKind::NoOutput,
                "no synchronous task completed",
            )
            .with_trace(trace, tasks_output));
        };

        let usage = run.usage.snapshot();
        log::info!(
            "Crew {} finished: requests={} cache_hits={} retries={}",
            id,
            usage.total_requests,
            usage.cache_hits,
            usage.retries
        );
        Ok(CrewOutput::new(raw, tasks_output, trace, usage))
    }
}

impl fmt::Display for Crew {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Crew(id={}, process={}, number_of_agents={}, number_of_tasks={})",
            self.id,
            self.process,
            self.agents.len(),
            self.tasks.len()
        )
    }
}

async fn execute_task(
    run: &RunContext,
    process: Process,
    task: &Task,
    upstream: Option<&str>,
) -> Result<TaskOutput> {
    match process {
        Process::Sequential => sequential::execute_task(run, task, upstream).await,
        Process::Hierarchical => hierarchical::execute_task(run, task, upstream).await,
    }
}

/// Build the crew described by `request` and run it.
///
/// Never returns an error: configuration and credential problems, as well as
/// anything that aborts the run, come back as [`RunOutcome::Failed`].
pub async fn run(
    request: RunRequest,
    registry: &ProviderRegistry,
    cancel: CancellationToken,
) -> RunOutcome {
    let crew = match Crew::from_request(&request, registry) {
        Ok(crew) => crew,
        Err(err) => {
            log::error!("Crew could not be built: {}", err);
            return RunOutcome::Failed(RunFailure::from_error(&err));
        }
    };
    crew.kickoff(&request.inputs, cancel).await.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use crate::agent::utils::AgentConfig;
    use crate::crews::execution_trace::TraceKind;
    use crate::llms::base_llm::{BaseLLM, LLMMessage};
    use crate::llms::credentials::{Credentials, MapConfig};
    use crate::llms::mock::MockLLM;
    use crate::llms::registry::{CredentialRequirements, ProviderSpec};
    use crate::task::{ExecutionMode, TaskConfig, TaskState};

    fn agent(role: &str, llm: MockLLM) -> Agent {
        Agent::new(role, format!("{role} goal"), format!("{role} backstory"), Box::new(llm))
    }

    fn user_prompt(messages: &[LLMMessage]) -> String {
        messages.last().map(|m| m.content.clone()).unwrap_or_default()
    }

    fn delegating_manager() -> MockLLM {
        MockLLM::responder(|messages| {
            let prompt = user_prompt(messages);
            match prompt.split_once("Observation: ") {
                Some((_, rest)) => Ok(format!(
                    "Thought: I have it\nFinal Answer: {}",
                    rest.lines().next().unwrap_or_default()
                )),
                None => Ok("Thought: ask A\nAction: Delegate work to coworker\nAction Input: {\"task\": \"Answer\", \"context\": \"\", \"coworker\": \"A\"}".to_string()),
            }
        })
    }

    /// Registry whose "Stub" provider picks a mock by model name.
    fn stub_registry() -> ProviderRegistry {
        let mut registry = ProviderRegistry::new(Arc::new(MapConfig::new()));
        registry.register(
            "Stub",
            CredentialRequirements::none(),
            Arc::new(|spec: &ProviderSpec, _: Credentials| {
                let llm = match spec.model.as_str() {
                    "manager" => delegating_manager(),
                    other => MockLLM::fixed(other.to_uppercase()),
                };
                Ok(Box::new(llm) as Box<dyn BaseLLM>)
            }),
        );
        registry
    }

    fn e2e_request() -> RunRequest {
        let mut manager = AgentConfig::new("M", "Coordinate", "Manages.", "Stub: manager");
        manager.allow_delegation = true;
        RunRequest {
            agents: vec![AgentConfig::new("A", "Answer", "Answers.", "Stub: ok"), manager],
            tasks: vec![TaskConfig {
                name: Some("answer".into()),
                description: "Get an answer".into(),
                expected_output: "An answer".into(),
                agent: None,
                execution_mode: ExecutionMode::Synchronous,
                depends_on: None,
            }],
            manager_role: Some("M".into()),
            process: Process::Hierarchical,
            options: CrewOptions::default(),
            inputs: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_end_to_end_single_delegation() {
        let outcome = run(e2e_request(), &stub_registry(), CancellationToken::new()).await;
        let output = outcome.into_result().unwrap();
        assert!(output.final_output().contains("OK"));
        assert_eq!(output.trace.count(TraceKind::Delegation), 1);
        assert_eq!(output.trace.delegations_to("A").count(), 1);
        let to_a = output
            .trace
            .iter()
            .filter(|e| e.delegated_to.as_ref().is_some_and(|roles| roles.iter().any(|r| r == "A")))
            .count();
        assert_eq!(to_a, 1);
        assert_eq!(output.task("answer").unwrap().delegations, 1);
        assert_eq!(output.token_usage.total_requests, 3);
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_any_call() {
        let mut request = e2e_request();
        request.agents[0].llm = "Groq: llama3".into();
        let registry = ProviderRegistry::with_defaults(Arc::new(MapConfig::new()));
        let outcome = run(request, &registry, CancellationToken::new()).await;
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::Credential);
        assert!(failure.trace.is_none());
    }

    #[test]
    fn test_manager_without_delegation_rejected() {
        let err = Crew::new(
            vec![agent("M", MockLLM::fixed("x")), agent("A", MockLLM::fixed("OK"))],
            vec![Task::new("Work", "Result")],
            Process::Hierarchical,
            Some("M"),
            CrewOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CrewError::Configuration(ref msg) if msg.contains("must allow delegation")));
    }

    #[test]
    fn test_invalid_definitions_rejected() {
        let build = |agents: Vec<Agent>, tasks: Vec<Task>, process, manager: Option<&str>| {
            Crew::new(agents, tasks, process, manager, CrewOptions::default())
        };
        let manager = || agent("M", MockLLM::fixed("x")).with_delegation(true);
        let worker = || agent("A", MockLLM::fixed("OK"));

        let cases = vec![
            build(vec![manager(), agent("M", MockLLM::fixed("y"))], vec![Task::new("t", "o")], Process::Hierarchical, Some("M")),
            build(vec![manager(), worker()], vec![Task::new("t", "o")], Process::Hierarchical, None),
            build(vec![manager(), worker()], vec![Task::new("t", "o")], Process::Hierarchical, Some("Boss")),
            build(vec![manager()], vec![Task::new("t", "o")], Process::Hierarchical, Some("M")),
            build(vec![manager(), worker()], vec![Task::new("t", "o").with_agent("Ghost")], Process::Hierarchical, Some("M")),
            build(vec![worker()], vec![Task::new("t", "o")], Process::Sequential, None),
            build(vec![worker()], vec![], Process::Sequential, None),
            build(
                vec![worker()],
                vec![
                    Task::new("t", "o").with_agent("A").with_depends_on("later"),
                    Task::new("t", "o").with_agent("A").with_name("later"),
                ],
                Process::Sequential,
                None,
            ),
            build(
                vec![worker()],
                vec![
                    Task::new("t", "o").with_agent("A").with_name("bg").with_execution_mode(ExecutionMode::FireAndForget),
                    Task::new("t", "o").with_agent("A").with_depends_on("bg"),
                ],
                Process::Sequential,
                None,
            ),
            build(
                vec![worker()],
                vec![
                    Task::new("t", "o").with_agent("A").with_name("same"),
                    Task::new("t", "o").with_agent("A").with_name("same"),
                ],
                Process::Sequential,
                None,
            ),
        ];
        for (index, case) in cases.into_iter().enumerate() {
            assert!(
                matches!(case, Err(CrewError::Configuration(_))),
                "case {} should be rejected",
                index
            );
        }
    }

    #[test]
    fn test_missing_prompt_file_rejected() {
        let options = CrewOptions {
            prompt_file: Some("/definitely/not/prompts.json".into()),
            ..CrewOptions::default()
        };
        let result = Crew::new(
            vec![agent("A", MockLLM::fixed("OK"))],
            vec![Task::new("t", "o").with_agent("A")],
            Process::Sequential,
            None,
            options,
        );
        assert!(matches!(result, Err(CrewError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_depends_on_passes_output_and_skips_background_work() {
        let editor = MockLLM::responder(|messages| Ok(user_prompt(messages)));
        let crew = Crew::new(
            vec![
                agent("Writer", MockLLM::fixed("the outline")),
                agent("Notes", MockLLM::fixed("background notes").with_latency(Duration::from_millis(5))),
                agent("Editor", editor),
            ],
            vec![
                Task::new("Outline {topic}", "Outline").with_agent("Writer").with_name("outline"),
                Task::new("Take notes", "Notes")
                    .with_agent("Notes")
                    .with_name("notes")
                    .with_execution_mode(ExecutionMode::FireAndForget),
                Task::new("Edit", "Final text").with_agent("Editor").with_depends_on("outline"),
            ],
            Process::Sequential,
            None,
            CrewOptions {
                memory: false,
                ..CrewOptions::default()
            },
        )
        .unwrap();

        let inputs = HashMap::from([("topic".to_string(), "rent".to_string())]);
        let output = crew.kickoff(&inputs, CancellationToken::new()).await.unwrap();
        assert!(output.raw.contains("the outline"));
        assert!(!output.raw.contains("background notes"));

        let names: Vec<_> = output.tasks_output.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(names, vec!["Outline rent", "Take notes", "Edit"]);
        assert_eq!(output.tasks_output[1].raw, "background notes");
    }

    #[tokio::test]
    async fn test_always_delegating_manager_hits_bound() {
        let always = MockLLM::fixed(
            "Action: Delegate work to coworker\nAction Input: {\"task\": \"More\", \"coworker\": \"A\"}",
        );
        let crew = Crew::new(
            vec![
                agent("M", always).with_delegation(true),
                agent("A", MockLLM::fixed("OK")),
            ],
            vec![Task::new("Loop", "Never").with_name("loop")],
            Process::Hierarchical,
            Some("M"),
            CrewOptions {
                max_delegation_depth: 3,
                ..CrewOptions::default()
            },
        )
        .unwrap();

        let failure = crew
            .kickoff(&HashMap::new(), CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(failure.kind, FailureKind::NoOutput);
        let trace = failure.trace.unwrap();
        assert_eq!(trace.count(TraceKind::Delegation), 3);
        assert_eq!(trace.count(TraceKind::TaskFailed), 1);
        assert_eq!(failure.tasks_output[0].state, TaskState::Failed);
    }

    #[tokio::test]
    async fn test_failed_task_does_not_stop_the_run() {
        let manager = MockLLM::responder(|messages| {
            let prompt = user_prompt(messages);
            if prompt.contains("Loop") {
                Ok("Action: Ask question to coworker\nAction Input: {\"question\": \"Again?\", \"coworker\": \"A\"}".to_string())
            } else {
                Ok("Final Answer: summary".to_string())
            }
        });
        let crew = Crew::new(
            vec![agent("M", manager).with_delegation(true), agent("A", MockLLM::fixed("yes"))],
            vec![Task::new("Loop", "Never"), Task::new("Summarize", "Summary")],
            Process::Hierarchical,
            Some("M"),
            CrewOptions {
                max_delegation_depth: 1,
                ..CrewOptions::default()
            },
        )
        .unwrap();

        let output = crew.kickoff(&HashMap::new(), CancellationToken::new()).await.unwrap();
        assert_eq!(output.raw, "summary");
        assert_eq!(output.tasks_output[0].state, TaskState::Failed);
        assert!(output.tasks_output[1].is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_fails_run() {
        let crew = Crew::new(
            vec![agent("A", MockLLM::fixed("late").with_latency(Duration::from_secs(600)))],
            vec![Task::new("Slow", "Eventually").with_agent("A")],
            Process::Sequential,
            None,
            CrewOptions::default(),
        )
        .unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });
        let failure = crew.kickoff(&HashMap::new(), cancel).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::Cancelled);
        assert!(failure.trace.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delegated_calls_share_the_rate_budget() {
        let mut request = e2e_request();
        request.options.max_rpm = Some(2);
        let start = tokio::time::Instant::now();
        let output = run(request, &stub_registry(), CancellationToken::new())
            .await
            .into_result()
            .unwrap();
        // manager, coworker, manager: the third call waits for the window
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert_eq!(output.token_usage.total_requests, 3);
    }

    fn remembering_crew(memory: bool) -> Crew {
        let manager = MockLLM::responder(|messages| {
            let prompt: String = messages.iter().map(|m| m.content.as_str()).collect();
            let remembered = prompt.contains("Useful context from earlier in this run");
            if prompt.contains("Current Task: First") {
                Ok(if remembered { "Final Answer: leaked" } else { "Final Answer: alpha result" }.to_string())
            } else if remembered && prompt.contains("- M: alpha result") {
                Ok("Final Answer: saw alpha".to_string())
            } else {
                Ok("Final Answer: nothing earlier".to_string())
            }
        });
        Crew::new(
            vec![agent("M", manager).with_delegation(true), agent("A", MockLLM::fixed("OK"))],
            vec![Task::new("First", "One"), Task::new("Second", "Two")],
            Process::Hierarchical,
            Some("M"),
            CrewOptions {
                memory,
                ..CrewOptions::default()
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_earlier_results_reach_the_manager() {
        let output = remembering_crew(true)
            .kickoff(&HashMap::new(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(output.tasks_output[0].raw, "alpha result");
        assert_eq!(output.raw, "saw alpha");
    }

    #[tokio::test]
    async fn test_memory_disabled_shares_nothing() {
        let output = remembering_crew(false)
            .kickoff(&HashMap::new(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(output.raw, "nothing earlier");
    }

    #[tokio::test]
    async fn test_memory_does_not_outlive_the_run() {
        remembering_crew(true)
            .kickoff(&HashMap::new(), CancellationToken::new())
            .await
            .unwrap();
        let output = remembering_crew(true)
            .kickoff(&HashMap::new(), CancellationToken::new())
            .await
            .unwrap();
        // the first task of a fresh run sees no summary
        assert_eq!(output.tasks_output[0].raw, "alpha result");
        assert_eq!(output.raw, "saw alpha");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_run_stops_background_tasks() {
        let finished = Arc::new(AtomicBool::new(false));
        let notes = {
            let finished = Arc::clone(&finished);
            MockLLM::responder(move |_| {
                finished.store(true, Ordering::SeqCst);
                Ok("notes".to_string())
            })
            .with_latency(Duration::from_secs(5))
        };
        let crew = Crew::new(
            vec![
                agent("Notes", notes),
                agent("Writer", MockLLM::fixed("late").with_latency(Duration::from_secs(600))),
            ],
            vec![
                Task::new("Take notes", "Notes")
                    .with_agent("Notes")
                    .with_execution_mode(ExecutionMode::FireAndForget),
                Task::new("Write", "Text").with_agent("Writer"),
            ],
            Process::Sequential,
            None,
            CrewOptions::default(),
        )
        .unwrap();

        let inputs = HashMap::new();
        let result = tokio::time::timeout(
            Duration::from_secs(1),
            crew.kickoff(&inputs, CancellationToken::new()),
        )
        .await;
        assert!(result.is_err());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[test]
    fn test_options_from_yaml() {
        let options: CrewOptions =
            serde_yaml::from_str("max_calls_per_minute: 10\nmemory: false\n").unwrap();
        assert_eq!(options.max_rpm, Some(10));
        assert!(!options.memory);
        assert!(options.cache);
        assert_eq!(options.max_delegation_depth, DEFAULT_MAX_DELEGATION_DEPTH);
    }
}
