//! Shared state of one run and the agent invocation path.
//!
//! Every agent call in a run, delegated or not, goes through
//! [`RunContext::invoke`]: render, cache lookup, rate-limit token, backend
//! call with bounded retry. The whole call races the run's cancellation
//! token.

use std::collections::HashMap;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::execution_trace::TraceRecorder;
use crate::agent::core::{Agent, PromptContext};
use crate::agents::cache::CacheHandler;
use crate::crew::CrewOptions;
use crate::llms::base_llm::LLMMessage;
use crate::memory::short_term::ShortTermMemory;
use crate::types::usage_metrics::UsageCounters;
use crate::utilities::errors::{BackendError, CrewError, Result};
use crate::utilities::prompts::Prompts;
use crate::utilities::rpm_controller::RPMController;

/// Everything a run shares between tasks and concurrent invocations.
#[derive(Debug)]
pub struct RunContext {
    agents: HashMap<String, Agent>,
    roles: Vec<String>,
    manager_role: Option<String>,
    pub(crate) prompts: Prompts,
    rpm: RPMController,
    cache: Option<CacheHandler>,
    memory: Option<ShortTermMemory>,
    pub(crate) usage: UsageCounters,
    pub(crate) trace: TraceRecorder,
    pub(crate) cancel: CancellationToken,
    pub(crate) max_delegation_depth: usize,
    max_retries: u32,
    retry_backoff: Duration,
}

impl RunContext {
    pub(crate) fn new(
        agents: Vec<Agent>,
        manager_role: Option<String>,
        options: &CrewOptions,
        prompts: Prompts,
        cancel: CancellationToken,
    ) -> Self {
        let roles: Vec<String> = agents.iter().map(|a| a.role().to_string()).collect();
        let agents = agents
            .into_iter()
            .map(|a| (a.role().to_string(), a))
            .collect();
        Self {
            agents,
            roles,
            manager_role,
            prompts,
            rpm: RPMController::new(options.max_rpm),
            cache: options.cache.then(CacheHandler::new),
            memory: options
                .memory
                .then(|| ShortTermMemory::new(options.memory_max_entries)),
            usage: UsageCounters::default(),
            trace: TraceRecorder::new(),
            cancel,
            max_delegation_depth: options.max_delegation_depth,
            max_retries: options.max_retries,
            retry_backoff: Duration::from_millis(options.retry_backoff_ms),
        }
    }

    /// Agent by role. Roles were validated when the crew was built.
    pub(crate) fn agent(&self, role: &str) -> Result<&Agent> {
        self.agents
            .get(role)
            .ok_or_else(|| CrewError::configuration(format!("no agent with role '{}'", role)))
    }

    pub(crate) fn manager(&self) -> Result<&Agent> {
        let role = self
            .manager_role
            .as_deref()
            .ok_or_else(|| CrewError::configuration("hierarchical process requires a manager"))?;
        self.agent(role)
    }

    /// Every role except the manager's, in declaration order.
    pub(crate) fn coworker_roles(&self) -> Vec<String> {
        self.roles
            .iter()
            .filter(|role| Some(role.as_str()) != self.manager_role.as_deref())
            .cloned()
            .collect()
    }

    pub(crate) fn memory_summary(&self) -> Option<String> {
        self.memory.as_ref().and_then(ShortTermMemory::summary)
    }

    pub(crate) fn remember(&self, value: &str, task: &str, agent: &str) {
        if let Some(memory) = &self.memory {
            let metadata = HashMap::from([("task".to_string(), task.to_string())]);
            memory.save(value, Some(metadata), Some(agent));
        }
    }

    /// Run `agent` on `ctx` under the run's cache, rate budget, retry policy
    /// and cancellation.
    pub(crate) async fn invoke(&self, agent: &Agent, ctx: &PromptContext) -> Result<String> {
        let messages = agent.render(&self.prompts, ctx);
        let call = async {
            match &self.cache {
                Some(cache) => {
                    let key = CacheHandler::key(agent.role(), &agent.llm().fingerprint(), &messages);
                    let (text, hit) = cache
                        .get_or_compute(&key, || self.call_with_retry(agent, &messages))
                        .await?;
                    if hit {
                        self.usage.record_cache_hit();
                        log::debug!("Cache hit for agent '{}'", agent.role());
                    }
                    Ok::<_, BackendError>(text)
                }
                None => self.call_with_retry(agent, &messages).await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CrewError::Cancelled),
            result = call => result.map_err(CrewError::from),
        }
    }

    async fn call_with_retry(
        &self,
        agent: &Agent,
        messages: &[LLMMessage],
    ) -> std::result::Result<String, BackendError> {
        let mut retry_delay = self.retry_backoff;
        let mut attempt = 0;
        loop {
            self.rpm.acquire().await;
            match agent.complete(messages).await {
                Ok(text) => {
                    self.usage.record_success();
                    return Ok(text);
                }
                Err(err) => {
                    self.usage.record_failure();
                    if !err.is_retryable() || attempt >= self.max_retries {
                        log::warn!("Agent '{}' call failed: {}", agent.role(), err);
                        return Err(err);
                    }
                    attempt += 1;
                    self.usage.record_retry();
                    log::warn!(
                        "Agent '{}' call failed ({}), retry {} of {} after {:?}",
                        agent.role(),
                        err,
                        attempt,
                        self.max_retries,
                        retry_delay
                    );
                    tokio::time::sleep(retry_delay).await;
                    retry_delay = next_delay(retry_delay);
                }
            }
        }
    }
}

/// Backoff after `delay`: doubled, saturating at [`Duration::MAX`].
fn next_delay(delay: Duration) -> Duration {
    delay.saturating_mul(2)
}
