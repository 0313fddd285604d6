//! Backend usage counters for a run.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Usage totals reported with a run's output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetrics {
    /// Backend calls issued, retries included.
    pub total_requests: u64,
    /// Calls that returned text.
    pub successful_requests: u64,
    /// Calls that returned an error.
    pub failed_requests: u64,
    /// Invocations answered from the cache.
    pub cache_hits: u64,
    /// Attempts made after a retryable failure.
    pub retries: u64,
}

impl UsageMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add usage metrics from another `UsageMetrics`.
    pub fn add_usage_metrics(&mut self, other: &UsageMetrics) {
        self.total_requests += other.total_requests;
        self.successful_requests += other.successful_requests;
        self.failed_requests += other.failed_requests;
        self.cache_hits += other.cache_hits;
        self.retries += other.retries;
    }
}

/// Lock-free counters updated by concurrent invocations.
#[derive(Debug, Default)]
pub struct UsageCounters {
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    cache_hits: AtomicU64,
    retries: AtomicU64,
}

impl UsageCounters {
    pub fn record_success(&self) {
        self.successful_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> UsageMetrics {
        let successful_requests = self.successful_requests.load(Ordering::Relaxed);
        let failed_requests = self.failed_requests.load(Ordering::Relaxed);
        UsageMetrics {
            total_requests: successful_requests + failed_requests,
            successful_requests,
            failed_requests,
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }
}
