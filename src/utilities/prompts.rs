//! Prompt assembly for agents and the manager.
//!
//! Every fragment comes from [`I18N`]; this module only decides which
//! fragments are used and fills their slots.

use crate::tools::capability::Capability;
use crate::utilities::i18n::{fill, get_i18n, I18N};

/// Agent metadata rendered into the system prompt.
#[derive(Debug, Clone, Copy)]
pub struct AgentInfo<'a> {
    pub role: &'a str,
    pub goal: &'a str,
    pub backstory: &'a str,
}

/// Builds prompt text from I18N slices.
#[derive(Debug, Clone)]
pub struct Prompts {
    pub i18n: I18N,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            i18n: get_i18n().clone(),
        }
    }
}

impl Prompts {
    pub fn new(i18n: I18N) -> Self {
        Self { i18n }
    }

    /// Role, backstory and goal, followed by the agent's declared
    /// capabilities when it has any.
    pub fn system_prompt(&self, agent: &AgentInfo<'_>, capabilities: &[Capability]) -> String {
        let mut prompt = fill(
            &self.i18n.slice("role_playing"),
            &[
                ("role", agent.role),
                ("backstory", agent.backstory),
                ("goal", agent.goal),
            ],
        );
        if !capabilities.is_empty() {
            let listing = capabilities
                .iter()
                .map(Capability::describe)
                .collect::<Vec<_>>()
                .join("\n");
            prompt.push_str(&fill(
                &self.i18n.slice("capabilities"),
                &[("capabilities", &format!("\n{}", listing))],
            ));
        }
        prompt
    }

    /// Task description and expected output, plus upstream context if any.
    pub fn task_prompt(
        &self,
        description: &str,
        expected_output: &str,
        upstream_context: Option<&str>,
    ) -> String {
        let mut prompt = fill(
            &self.i18n.slice("task"),
            &[("input", description), ("expected_output", expected_output)],
        );
        if let Some(context) = upstream_context.filter(|c| !c.trim().is_empty()) {
            prompt.push_str(&fill(&self.i18n.slice("context"), &[("context", context)]));
        }
        prompt
    }

    /// ReAct tool instructions listing the given tools.
    pub fn tools_section(&self, descriptions: &str, names: &str) -> String {
        fill(
            &self.i18n.slice("tools"),
            &[("tools", descriptions), ("tool_names", names)],
        )
    }

    pub fn memory_section(&self, summary: &str) -> String {
        fill(&self.i18n.slice("memory"), &[("memory", summary)])
    }

    pub fn preferred_coworker(&self, role: &str) -> String {
        fill(&self.i18n.slice("preferred_coworker"), &[("coworker", role)])
    }

    /// Steps taken so far, as one block.
    pub fn scratchpad(&self, steps: &[String]) -> String {
        fill(&self.i18n.slice("scratchpad"), &[("steps", &steps.concat())])
    }

    /// One delegation step and its result.
    pub fn observation(&self, tool: &str, coworker: &str, result: &str) -> String {
        fill(
            &self.i18n.slice("observation"),
            &[("tool", tool), ("coworker", coworker), ("result", result)],
        )
    }

    /// A correction fed back to the manager without any delegation.
    pub fn note(&self, result: &str) -> String {
        fill(&self.i18n.slice("note"), &[("result", result)])
    }

    /// Expected output used when a coworker answers the manager.
    pub fn manager_request(&self) -> String {
        self.i18n.slice("manager_request")
    }

    pub fn begin(&self) -> String {
        self.i18n.slice("begin")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> AgentInfo<'static> {
        AgentInfo {
            role: "Planner",
            goal: "Draft the plan",
            backstory: "A seasoned organiser.",
        }
    }

    #[test]
    fn test_system_prompt_without_capabilities() {
        let prompt = Prompts::default().system_prompt(&info(), &[]);
        assert_eq!(
            prompt,
            "You are Planner. A seasoned organiser.\nYour personal goal is: Draft the plan"
        );
    }

    #[test]
    fn test_system_prompt_lists_capabilities() {
        let tools = vec![Capability::new("pdf_search", "Search the uploaded PDF")];
        let prompt = Prompts::default().system_prompt(&info(), &tools);
        assert!(prompt.contains("pdf_search: Search the uploaded PDF"));
    }

    #[test]
    fn test_task_prompt_with_context() {
        let prompts = Prompts::default();
        let prompt = prompts.task_prompt("Write ideas", "Five bullet points", Some("Prior plan"));
        assert!(prompt.contains("Current Task: Write ideas"));
        assert!(prompt.contains("expected criteria for your final answer: Five bullet points"));
        assert!(prompt.contains("Prior plan"));

        let bare = prompts.task_prompt("Write ideas", "Five bullet points", Some("  "));
        assert!(!bare.contains("context you're working with"));
    }

    #[test]
    fn test_observation_and_scratchpad() {
        let prompts = Prompts::default();
        let step = prompts.observation("Delegate work to coworker", "Writer", "Draft done");
        assert!(step.contains("Observation: Draft done"));
        let pad = prompts.scratchpad(&[step]);
        assert!(pad.contains("(Writer)"));
    }
}
