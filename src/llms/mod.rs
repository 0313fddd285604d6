//! Completion backends.
//!
//! - [`base_llm`] - the [`BaseLLM`] trait every backend implements
//! - [`credentials`] - injected configuration lookup and per-backend credentials
//! - [`registry`] - provider selector resolution
//! - [`providers`] - HTTP providers (OpenAI, Groq, Anthropic, LM Studio)
//! - [`mock`] - offline backend for tests

pub mod base_llm;
pub mod credentials;
pub mod mock;
pub mod providers;
pub mod registry;

pub use base_llm::{BaseLLM, BaseLLMState, LLMMessage};
pub use credentials::{ConfigSource, Credentials, EnvConfig, FnConfig, MapConfig};
pub use mock::MockLLM;
pub use registry::{ProviderRegistry, ProviderSpec};
