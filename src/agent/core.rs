//! Core Agent struct.
//!
//! An agent is a role bound to one completion backend. It renders its
//! backstory, goal and capabilities together with a task's prompt context
//! into chat messages and returns the backend's raw text. Agents are
//! immutable once built; changing any field means building a new agent.

use std::collections::HashMap;
use std::fmt;

use uuid::Uuid;

use crate::llms::base_llm::{BaseLLM, LLMMessage};
use crate::tools::capability::Capability;
use crate::utilities::errors::BackendError;
use crate::utilities::prompts::{AgentInfo, Prompts};
use crate::utilities::string_utils::interpolate_only;

/// What an agent is asked to work on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptContext {
    pub description: String,
    pub expected_output: String,
    /// Output of the task this one depends on, or context shared by the manager.
    pub upstream_context: Option<String>,
    /// Extra system instructions, such as the manager's tool listing.
    pub tool_instructions: Option<String>,
    /// Extra sections appended to the user message, in order.
    pub notes: Vec<String>,
}

impl PromptContext {
    pub fn new(description: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            expected_output: expected_output.into(),
            ..Self::default()
        }
    }

    pub fn with_upstream(mut self, context: Option<String>) -> Self {
        self.upstream_context = context;
        self
    }

    pub fn with_tool_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.tool_instructions = Some(instructions.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

/// A role-bound actor wrapping a completion backend.
pub struct Agent {
    id: Uuid,
    role: String,
    goal: String,
    backstory: String,
    tools: Vec<Capability>,
    allow_delegation: bool,
    llm: Box<dyn BaseLLM>,
}

impl Agent {
    /// Create an agent without capabilities that may not delegate.
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
        llm: Box<dyn BaseLLM>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            tools: Vec::new(),
            allow_delegation: false,
            llm,
        }
    }

    pub fn with_tools(mut self, tools: Vec<Capability>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_delegation(mut self, allow_delegation: bool) -> Self {
        self.allow_delegation = allow_delegation;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn backstory(&self) -> &str {
        &self.backstory
    }

    pub fn tools(&self) -> &[Capability] {
        &self.tools
    }

    pub fn allow_delegation(&self) -> bool {
        self.allow_delegation
    }

    pub fn llm(&self) -> &dyn BaseLLM {
        self.llm.as_ref()
    }

    /// Fill `{placeholders}` in goal and backstory. The role is the lookup
    /// key and is left as written.
    pub fn interpolate_inputs(self, inputs: &HashMap<String, String>) -> Self {
        if inputs.is_empty() {
            return self;
        }
        Self {
            goal: interpolate_only(&self.goal, inputs),
            backstory: interpolate_only(&self.backstory, inputs),
            ..self
        }
    }

    /// Render the system and user messages for `ctx`.
    pub fn render(&self, prompts: &Prompts, ctx: &PromptContext) -> Vec<LLMMessage> {
        let info = AgentInfo {
            role: &self.role,
            goal: &self.goal,
            backstory: &self.backstory,
        };
        let mut system = prompts.system_prompt(&info, &self.tools);
        if let Some(instructions) = &ctx.tool_instructions {
            system.push_str(instructions);
        }

        let mut user = prompts.task_prompt(
            &ctx.description,
            &ctx.expected_output,
            ctx.upstream_context.as_deref(),
        );
        for note in &ctx.notes {
            user.push_str(note);
        }

        vec![LLMMessage::system(system), LLMMessage::user(user)]
    }

    /// Send already rendered messages to the backend.
    pub async fn complete(&self, messages: &[LLMMessage]) -> Result<String, BackendError> {
        self.llm.complete(messages).await
    }

    /// Render `ctx` with `prompts` and return the backend's text. Makes
    /// exactly one backend call.
    pub async fn invoke(&self, prompts: &Prompts, ctx: &PromptContext) -> Result<String, BackendError> {
        let messages = self.render(prompts, ctx);
        self.complete(&messages).await
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("allow_delegation", &self.allow_delegation)
            .field("tools", &self.tools)
            .field("llm", &self.llm.fingerprint())
            .finish()
    }
}
