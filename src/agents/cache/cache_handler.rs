//! Run-scoped completion cache.
//!
//! Entries are keyed by a SHA-256 over the agent role, the backend
//! fingerprint and the rendered messages. Each key maps to a shared
//! `OnceCell`, so concurrent callers with the same key wait for a single
//! in-flight computation. Failed or cancelled computations leave the cell
//! empty and the next caller retries.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;

use crate::llms::base_llm::LLMMessage;

/// Single-flight memo of completion results.
#[derive(Debug, Default)]
pub struct CacheHandler {
    entries: DashMap<String, Arc<OnceCell<String>>>,
}

impl CacheHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key for one rendered request.
    pub fn key(role: &str, fingerprint: &str, messages: &[LLMMessage]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(role.as_bytes());
        hasher.update([0u8]);
        hasher.update(fingerprint.as_bytes());
        for message in messages {
            hasher.update([0u8]);
            hasher.update(message.role.as_bytes());
            hasher.update([0u8]);
            hasher.update(message.content.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Return the cached value for `key`, computing it at most once.
    ///
    /// The flag is `true` when the value came from the cache, including when
    /// this caller waited on another caller's computation.
    pub async fn get_or_compute<F, Fut, E>(&self, key: &str, compute: F) -> Result<(String, bool), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        let cell = Arc::clone(&self.entries.entry(key.to_string()).or_default());
        if let Some(value) = cell.get() {
            return Ok((value.clone(), true));
        }

        let mut computed = false;
        let value = cell
            .get_or_try_init(|| {
                computed = true;
                compute()
            })
            .await?;
        Ok((value.clone(), !computed))
    }

    /// Read a completed entry.
    pub fn read(&self, key: &str) -> Option<String> {
        self.entries.get(key).and_then(|cell| cell.get().cloned())
    }

    /// Number of completed entries.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.value().initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn messages(text: &str) -> Vec<LLMMessage> {
        vec![LLMMessage::system("You are Writer."), LLMMessage::user(text)]
    }

    #[test]
    fn test_key_depends_on_role_backend_and_prompt() {
        let base = CacheHandler::key("Writer", "OpenAI:gpt-4o:0.1", &messages("a"));
        assert_eq!(base, CacheHandler::key("Writer", "OpenAI:gpt-4o:0.1", &messages("a")));
        assert_ne!(base, CacheHandler::key("Editor", "OpenAI:gpt-4o:0.1", &messages("a")));
        assert_ne!(base, CacheHandler::key("Writer", "OpenAI:gpt-4o:0.7", &messages("a")));
        assert_ne!(base, CacheHandler::key("Writer", "OpenAI:gpt-4o:0.1", &messages("b")));
        assert_eq!(base.len(), 64);
    }

    #[tokio::test]
    async fn test_cache_add_and_read() {
        let cache = CacheHandler::new();
        let (value, hit) = cache
            .get_or_compute("k", || async { Ok::<_, ()>("Found results".to_string()) })
            .await
            .unwrap();
        assert_eq!(value, "Found results");
        assert!(!hit);

        let (value, hit) = cache
            .get_or_compute("k", || async { Ok::<_, ()>("other".to_string()) })
            .await
            .unwrap();
        assert_eq!(value, "Found results");
        assert!(hit);
        assert_eq!(cache.read("k").as_deref(), Some("Found results"));
        assert_eq!(cache.read("missing"), None);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = CacheHandler::new();
        let failed = cache
            .get_or_compute("k", || async { Err::<String, _>("boom") })
            .await;
        assert_eq!(failed, Err("boom"));
        assert!(cache.is_empty());

        let (value, hit) = cache
            .get_or_compute("k", || async { Ok::<_, &str>("ok".to_string()) })
            .await
            .unwrap();
        assert_eq!((value.as_str(), hit), ("ok", false));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_flight() {
        let cache = Arc::new(CacheHandler::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    cache
                        .get_or_compute("same", || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_secs(2)).await;
                            Ok::<_, ()>("plan".to_string())
                        })
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut hits = 0;
        for task in tasks {
            let (value, hit) = task.await.unwrap();
            assert_eq!(value, "plan");
            hits += usize::from(hit);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(hits, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_computation_leaves_no_reservation() {
        let cache = CacheHandler::new();
        let slow = cache.get_or_compute("k", || async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, ()>("late".to_string())
        });
        assert!(tokio::time::timeout(Duration::from_secs(1), slow).await.is_err());
        assert_eq!(cache.read("k"), None);

        let (value, hit) = cache
            .get_or_compute("k", || async { Ok::<_, ()>("fresh".to_string()) })
            .await
            .unwrap();
        assert_eq!((value.as_str(), hit), ("fresh", false));
    }
}
