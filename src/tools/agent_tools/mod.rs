//! Tools that let the manager delegate work and ask questions.

pub mod agent_tools;
pub mod ask_question_tool;
pub mod delegate_work_tool;

pub use agent_tools::{AgentTools, DelegationKind, DelegationRequest};
pub use ask_question_tool::AskQuestionTool;
pub use delegate_work_tool::DelegateWorkTool;
