//! Run-scoped memory.

pub mod short_term;

pub use short_term::{ShortTermMemory, ShortTermMemoryItem};
