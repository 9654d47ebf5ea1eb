//! Routing table
//!
//! Maps each [`TaskType`] to a [`RoutePolicy`]. The `default` policy is
//! mandatory and answers every task without its own entry.

use super::types::{ModelTarget, ProviderId, TaskType};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// How one kind of task is served
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePolicy {
    /// Tried first
    pub primary: ModelTarget,
    /// Tried when the primary is unavailable or exhausted
    pub fallback: ModelTarget,
    /// Bound on each provider call
    pub timeout_ms: u64,
    /// Attempts per provider (0 behaves like 1)
    pub max_retries: u32,
}

impl RoutePolicy {
    /// Create a policy
    #[must_use]
    pub fn new(primary: ModelTarget, fallback: ModelTarget, timeout_ms: u64, max_retries: u32) -> Self {
        Self {
            primary,
            fallback,
            timeout_ms,
            max_retries,
        }
    }

    /// Attempts allowed against each provider
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }
}

/// Task → policy lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingTable {
    /// Policy for tasks without their own entry
    pub default: RoutePolicy,
    /// Per-task policies
    #[serde(default)]
    pub tasks: HashMap<TaskType, RoutePolicy>,
}

impl RoutingTable {
    /// Create a table holding only the default policy
    #[must_use]
    pub fn new(default: RoutePolicy) -> Self {
        Self {
            default,
            tasks: HashMap::new(),
        }
    }

    /// Add or replace one task's policy
    #[must_use]
    pub fn with_policy(mut self, task: impl Into<TaskType>, policy: RoutePolicy) -> Self {
        self.tasks.insert(task.into(), policy);
        self
    }

    /// Policy for a task, copied so later table changes cannot affect it
    #[must_use]
    pub fn resolve(&self, task: &TaskType) -> RoutePolicy {
        self.tasks.get(task).unwrap_or(&self.default).clone()
    }

    /// Whether the task has its own entry
    #[must_use]
    pub fn has_task(&self, task: &TaskType) -> bool {
        self.tasks.contains_key(task)
    }

    /// Every provider referenced by any policy
    #[must_use]
    pub fn providers(&self) -> BTreeSet<ProviderId> {
        std::iter::once(&self.default)
            .chain(self.tasks.values())
            .flat_map(|policy| [policy.primary.provider, policy.fallback.provider])
            .collect()
    }

    /// Reject policies that cannot work
    pub fn validate(&self) -> Result<()> {
        let policies = std::iter::once(("default", &self.default))
            .chain(self.tasks.iter().map(|(task, policy)| (task.as_str(), policy)));

        for (task, policy) in policies {
            if policy.timeout_ms == 0 {
                return Err(Error::Config(format!("policy '{task}' has a zero timeout")));
            }
            if policy.primary.model.is_empty() || policy.fallback.model.is_empty() {
                return Err(Error::Config(format!("policy '{task}' has an empty model key")));
            }
        }
        Ok(())
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        use ProviderId::{Anthropic, Gemini, Groq, OpenAi};

        let policy = |primary: (ProviderId, &str), fallback: (ProviderId, &str), timeout_ms, retries| {
            RoutePolicy::new(
                ModelTarget::new(primary.0, primary.1),
                ModelTarget::new(fallback.0, fallback.1),
                timeout_ms,
                retries,
            )
        };

        Self::new(policy((Anthropic, "claude-haiku"), (OpenAi, "gpt-mini"), 30_000, 2))
            .with_policy(
                TaskType::IMPROVE_SUMMARY,
                policy((Anthropic, "claude-sonnet"), (OpenAi, "gpt"), 30_000, 2),
            )
            .with_policy(
                TaskType::IMPROVE_EXPERIENCE,
                policy((Anthropic, "claude-haiku"), (Groq, "llama-large"), 30_000, 2),
            )
            .with_policy(
                TaskType::SUGGEST_SKILLS,
                policy((Groq, "llama-large"), (Gemini, "gemini-flash"), 20_000, 2),
            )
            .with_policy(
                TaskType::PARSE_JOB,
                policy((OpenAi, "gpt-mini"), (Gemini, "gemini-flash"), 45_000, 2),
            )
            .with_policy(
                TaskType::SCORE_RESUME,
                policy((Anthropic, "claude-sonnet"), (Gemini, "gemini-pro"), 60_000, 2),
            )
            .with_policy(
                TaskType::COVER_LETTER,
                policy((Anthropic, "claude-sonnet"), (OpenAi, "gpt"), 60_000, 2),
            )
            .with_policy(
                TaskType::TRANSLATE,
                policy((Gemini, "gemini-flash"), (OpenAi, "gpt-mini"), 30_000, 2),
            )
            .with_policy(
                TaskType::CHAT,
                policy((Groq, "llama-large"), (Anthropic, "claude-haiku"), 20_000, 3),
            )
    }
}
