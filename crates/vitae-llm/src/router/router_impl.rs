//! AI Router implementation
//!
//! This module contains [`AiRouter`], which masks outbound text, picks a
//! provider from the routing table, retries with backoff, falls back, and
//! keeps usage statistics.

use super::config::RouterSettings;
use super::provider::LlmProvider;
use super::registry::ProviderRegistry;
use super::retry::RetryPolicy;
use super::rules::{RoutePolicy, RoutingTable};
use super::stats::{RouterStats, StatsRecorder};
use super::types::{ModelTarget, ProviderId, TaskType};
use crate::completion::{CompletionOptions, CompletionResult};
use crate::cost::CostBreakdown;
use crate::error::{Error, Result};
use crate::providers::anthropic::{AnthropicConfig, AnthropicProvider};
use crate::providers::gemini::{GeminiConfig, GeminiProvider};
use crate::providers::groq::{GroqConfig, GroqProvider};
use crate::providers::openai::{OpenAiConfig, OpenAiProvider};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use vitae_pii::Masked;

// ============================================================================
// Options & Reports
// ============================================================================

/// Caller-supplied generation options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteOptions {
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Upper bound on generated tokens
    pub max_tokens: Option<u32>,
}

impl RouteOptions {
    /// Set temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Result of [`AiRouter::check_availability`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityReport {
    /// Availability of every registered provider
    pub per_provider: BTreeMap<ProviderId, bool>,
    /// Whether at least one provider can serve requests
    pub any_available: bool,
}

/// Options for one provider call under a policy
pub(super) fn call_options(
    target: &ModelTarget,
    policy: &RoutePolicy,
    options: &RouteOptions,
) -> CompletionOptions {
    CompletionOptions {
        model: target.model.clone(),
        temperature: options.temperature,
        max_tokens: options.max_tokens,
        timeout_ms: policy.timeout_ms,
    }
}

/// Terminal error once the fallback is unavailable too.
///
/// The primary's last error, if it was attempted, is only logged.
pub(super) fn no_provider_available(task: &TaskType, primary_error: Option<&Error>) -> Error {
    if let Some(error) = primary_error {
        warn!(%task, %error, "Fallback provider unavailable after primary failure");
    }
    Error::NoProviderAvailable {
        task: task.to_string(),
    }
}

struct Served {
    result: CompletionResult,
    cost: CostBreakdown,
    via_fallback: bool,
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`AiRouter`]
#[derive(Debug, Default)]
pub struct AiRouterBuilder {
    registry: ProviderRegistry,
    routing: Option<RoutingTable>,
    retry: RetryPolicy,
}

impl AiRouterBuilder {
    /// Register an adapter under its own id
    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.registry.register(provider);
        self
    }

    /// Use this routing table instead of the built-in one
    #[must_use]
    pub fn routing_table(mut self, table: RoutingTable) -> Self {
        self.routing = Some(table);
        self
    }

    /// Set the backoff schedule
    #[must_use]
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build the router, rejecting tables that name unregistered providers
    pub fn build(self) -> Result<AiRouter> {
        let routing = self.routing.unwrap_or_default();
        self.registry.validate(&routing)?;

        Ok(AiRouter {
            providers: Arc::new(self.registry),
            routing: RwLock::new(Arc::new(routing)),
            stats: Arc::new(StatsRecorder::default()),
            retry: self.retry,
        })
    }
}

// ============================================================================
// Router
// ============================================================================

/// Routes résumé tasks to AI providers
///
/// Each router owns its statistics; construct one per application and
/// share it behind an `Arc`.
pub struct AiRouter {
    pub(super) providers: Arc<ProviderRegistry>,
    pub(super) routing: RwLock<Arc<RoutingTable>>,
    pub(super) stats: Arc<StatsRecorder>,
    pub(super) retry: RetryPolicy,
}

impl AiRouter {
    /// Start building a router
    #[must_use]
    pub fn builder() -> AiRouterBuilder {
        AiRouterBuilder::default()
    }

    /// Build a router with all four HTTP adapters from settings
    pub fn from_settings(settings: &RouterSettings) -> Result<Self> {
        let providers = &settings.providers;

        Self::builder()
            .provider(Arc::new(AnthropicProvider::new(AnthropicConfig::from_settings(
                providers.get(ProviderId::Anthropic),
            ))?))
            .provider(Arc::new(OpenAiProvider::new(OpenAiConfig::from_settings(
                providers.get(ProviderId::OpenAi),
            ))?))
            .provider(Arc::new(GeminiProvider::new(GeminiConfig::from_settings(
                providers.get(ProviderId::Gemini),
            ))?))
            .provider(Arc::new(GroqProvider::new(GroqConfig::from_settings(
                providers.get(ProviderId::Groq),
            ))?))
            .routing_table(settings.routing.clone())
            .retry_policy(settings.retry.to_policy())
            .build()
    }

    /// Current routing table
    #[must_use]
    pub fn routing_table(&self) -> Arc<RoutingTable> {
        self.routing.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Replace the routing table.
    ///
    /// Requests already dispatched keep the policy they started with.
    pub fn set_routing_table(&self, table: RoutingTable) -> Result<()> {
        self.providers.validate(&table)?;
        *self.routing.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(table);
        info!("Routing table replaced");
        Ok(())
    }

    /// Policy a task would be dispatched with right now
    #[must_use]
    pub fn policy_for(&self, task: &TaskType) -> RoutePolicy {
        self.routing_table().resolve(task)
    }

    /// Route a request and wait for the full answer.
    ///
    /// `user_input` is masked before it reaches any provider and the answer
    /// is unmasked before it is returned.
    ///
    /// `task_type` takes a [`TaskType`] constant, a `&'static str` or an
    /// owned `String`. A task key borrowed at runtime has to be copied first,
    /// e.g. `key.to_owned()`.
    pub async fn route(
        &self,
        task_type: impl Into<TaskType>,
        system_prompt: &str,
        user_input: &str,
        options: &RouteOptions,
    ) -> Result<CompletionResult> {
        self.dispatch(
            task_type.into(),
            system_prompt,
            user_input,
            options,
            &CancellationToken::new(),
        )
        .await
    }

    /// [`route`](Self::route) that gives up with [`Error::Cancelled`] once
    /// `cancel` fires, aborting the in-flight provider call.
    pub async fn route_with_cancel(
        &self,
        task_type: impl Into<TaskType>,
        system_prompt: &str,
        user_input: &str,
        options: &RouteOptions,
        cancel: &CancellationToken,
    ) -> Result<CompletionResult> {
        self.dispatch(task_type.into(), system_prompt, user_input, options, cancel)
            .await
    }

    /// Statistics since construction or the last reset
    #[must_use]
    pub fn get_stats(&self) -> RouterStats {
        self.stats.snapshot()
    }

    /// Zero every counter
    pub fn reset_stats(&self) {
        self.stats.reset();
        info!("Router statistics reset");
    }

    /// Availability of every registered provider
    #[must_use]
    pub fn check_availability(&self) -> AvailabilityReport {
        let per_provider = self.providers.availability();
        let any_available = per_provider.values().any(|available| *available);
        AvailabilityReport {
            per_provider,
            any_available,
        }
    }

    pub(super) fn available(&self, id: ProviderId) -> Option<&Arc<dyn LlmProvider>> {
        self.providers.get(id).filter(|provider| provider.is_available())
    }

    #[instrument(name = "route", skip_all, fields(task = %task, request_id = %Uuid::new_v4()))]
    async fn dispatch(
        &self,
        task: TaskType,
        system_prompt: &str,
        user_input: &str,
        options: &RouteOptions,
        cancel: &CancellationToken,
    ) -> Result<CompletionResult> {
        let policy = self.policy_for(&task);
        let Masked { masked, mapping } = vitae_pii::mask(user_input);
        self.stats.begin_request();

        debug!(
            primary = %policy.primary,
            fallback = %policy.fallback,
            input_len = masked.len(),
            masked_spans = mapping.len(),
            "Dispatching request"
        );

        match self
            .serve(&task, &policy, system_prompt, &masked, options, cancel)
            .await
        {
            Ok(Served {
                mut result,
                cost,
                via_fallback,
            }) => {
                self.stats
                    .record_success(result.provider, &result.usage, cost.total_cost, via_fallback);
                info!(
                    provider = %result.provider,
                    model = %result.model,
                    via_fallback,
                    tokens = result.usage.total_tokens,
                    cost = cost.total_cost,
                    "Request served"
                );
                result.content = vitae_pii::unmask(&result.content, &mapping);
                Ok(result)
            }
            Err(e) => {
                self.stats.record_failure();
                warn!(error = %e, "Request failed");
                Err(e)
            }
        }
    }

    async fn serve(
        &self,
        task: &TaskType,
        policy: &RoutePolicy,
        system_prompt: &str,
        input: &str,
        options: &RouteOptions,
        cancel: &CancellationToken,
    ) -> Result<Served> {
        let mut primary_error = None;

        match self.available(policy.primary.provider) {
            Some(primary) => {
                match self
                    .attempt(primary, &policy.primary, policy, system_prompt, input, options, cancel)
                    .await
                {
                    Ok(served) => return Ok(served),
                    Err(Error::Cancelled) => return Err(Error::Cancelled),
                    Err(Error::NotConfigured(reason)) => {
                        info!(provider = %policy.primary.provider, %reason, "Primary provider not configured, using fallback");
                    }
                    Err(e) => {
                        warn!(provider = %policy.primary.provider, error = %e, "Primary provider exhausted, using fallback");
                        primary_error = Some(e);
                    }
                }
            }
            None => {
                info!(provider = %policy.primary.provider, "Primary provider unavailable, using fallback");
            }
        }

        let Some(fallback) = self.available(policy.fallback.provider) else {
            return Err(no_provider_available(task, primary_error.as_ref()));
        };

        match self
            .attempt(fallback, &policy.fallback, policy, system_prompt, input, options, cancel)
            .await
        {
            Ok(served) => Ok(Served {
                via_fallback: true,
                ..served
            }),
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(Error::NotConfigured(_)) => Err(no_provider_available(task, primary_error.as_ref())),
            Err(e) => Err(Error::AllProvidersFailed {
                task: task.to_string(),
                source: Box::new(e),
            }),
        }
    }

    /// Call one provider up to `policy.attempts()` times
    #[allow(clippy::too_many_arguments)]
    async fn attempt(
        &self,
        provider: &Arc<dyn LlmProvider>,
        target: &ModelTarget,
        policy: &RoutePolicy,
        system_prompt: &str,
        input: &str,
        options: &RouteOptions,
        cancel: &CancellationToken,
    ) -> Result<Served> {
        let request = call_options(target, policy, options);
        let max_attempts = policy.attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Cancelled),
                outcome = provider.complete(system_prompt, input, &request) => outcome,
            };

            match outcome {
                Ok(result) => {
                    if attempt > 1 {
                        debug!(provider = %target.provider, attempt, "Provider succeeded after retry");
                    }
                    let cost = provider.calculate_cost(
                        result.usage.input_tokens,
                        result.usage.output_tokens,
                        &result.model,
                    );
                    return Ok(Served {
                        result,
                        cost,
                        via_fallback: false,
                    });
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        provider = %target.provider,
                        model = %target.model,
                        attempt,
                        max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Provider call failed, retrying"
                    );
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(Error::Cancelled),
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => {
                    debug!(provider = %target.provider, attempt, error = %e, "Giving up on provider");
                    return Err(e);
                }
            }
        }
    }
}

impl std::fmt::Debug for AiRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiRouter")
            .field("providers", &self.providers)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
