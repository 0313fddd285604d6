//! Completion cache.

pub mod cache_handler;

pub use cache_handler::CacheHandler;
