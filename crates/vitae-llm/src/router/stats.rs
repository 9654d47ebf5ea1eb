//! Router usage statistics
//!
//! Counters are owned by one router instance. Every update happens in one
//! short critical section, so `successful + failed <= total` holds for
//! every snapshot.

use super::types::ProviderId;
use crate::completion::TokenUsage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Usage attributed to one provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderUsage {
    /// Requests this provider served successfully
    pub requests: u64,
    /// Accumulated cost (USD)
    pub cost: f64,
    /// Accumulated prompt tokens
    pub input_tokens: u64,
    /// Accumulated generated tokens
    pub output_tokens: u64,
}

/// Snapshot of router counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterStats {
    /// Requests accepted
    pub total_requests: u64,
    /// Requests that returned content
    pub successful_requests: u64,
    /// Requests that ended in an error
    pub failed_requests: u64,
    /// Successful requests served by a fallback provider
    pub fallback_used: u64,
    /// Accumulated cost (USD)
    pub total_cost: f64,
    /// Per-provider breakdown
    pub by_provider: BTreeMap<ProviderId, ProviderUsage>,
    /// `successful / total`, formatted like `"66.67%"`
    pub success_rate: String,
    /// `fallback / total`, formatted like `"12.50%"`
    pub fallback_rate: String,
    /// When counting started or was last reset
    pub since: DateTime<Utc>,
}

#[derive(Debug)]
struct Counters {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    fallback_used: u64,
    total_cost: f64,
    by_provider: BTreeMap<ProviderId, ProviderUsage>,
    since: DateTime<Utc>,
}

impl Counters {
    fn new() -> Self {
        Self {
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            fallback_used: 0,
            total_cost: 0.0,
            by_provider: BTreeMap::new(),
            since: Utc::now(),
        }
    }
}

/// Format `part / total` as a percentage, `"0%"` when nothing was counted
#[must_use]
pub fn format_rate(part: u64, total: u64) -> String {
    if total == 0 {
        return "0%".to_string();
    }
    format!("{:.2}%", part as f64 / total as f64 * 100.0)
}

/// Thread-safe recorder behind [`RouterStats`]
#[derive(Debug)]
pub(crate) struct StatsRecorder {
    inner: Mutex<Counters>,
}

impl Default for StatsRecorder {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Counters::new()),
        }
    }
}

impl StatsRecorder {
    fn with<R>(&self, f: impl FnOnce(&mut Counters) -> R) -> R {
        let mut counters = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut counters)
    }

    pub fn begin_request(&self) {
        self.with(|c| c.total_requests += 1);
    }

    pub fn record_success(&self, provider: ProviderId, usage: &TokenUsage, cost: f64, via_fallback: bool) {
        self.with(|c| {
            c.successful_requests += 1;
            if via_fallback {
                c.fallback_used += 1;
            }
            c.total_cost += cost;

            let bucket = c.by_provider.entry(provider).or_default();
            bucket.requests += 1;
            bucket.cost += cost;
            bucket.input_tokens += u64::from(usage.input_tokens);
            bucket.output_tokens += u64::from(usage.output_tokens);
        });
    }

    pub fn record_failure(&self) {
        self.with(|c| c.failed_requests += 1);
    }

    pub fn snapshot(&self) -> RouterStats {
        self.with(|c| RouterStats {
            total_requests: c.total_requests,
            successful_requests: c.successful_requests,
            failed_requests: c.failed_requests,
            fallback_used: c.fallback_used,
            total_cost: c.total_cost,
            by_provider: c.by_provider.clone(),
            success_rate: format_rate(c.successful_requests, c.total_requests),
            fallback_rate: format_rate(c.fallback_used, c.total_requests),
            since: c.since,
        })
    }

    pub fn reset(&self) {
        self.with(|c| *c = Counters::new());
    }
}
