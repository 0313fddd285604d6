//! Manager-side plumbing: ReAct reply parsing and the completion cache.

pub mod cache;
pub mod parser;

pub use cache::CacheHandler;
pub use parser::{AgentAction, AgentFinish, OutputParserError, ParseResult};
