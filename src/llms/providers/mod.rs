//! HTTP provider implementations.
//!
//! | Provider | Module | Wire format |
//! |----------|--------|-------------|
//! | OpenAI | [`openai`] | chat completions |
//! | Groq | [`groq`] | chat completions |
//! | LM Studio | [`lm_studio`] | chat completions |
//! | Anthropic | [`anthropic`] | messages |

pub mod anthropic;
pub mod groq;
pub mod lm_studio;
pub mod openai;
