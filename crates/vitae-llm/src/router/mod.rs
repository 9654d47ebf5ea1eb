//! Router - task routing across AI providers
//!
//! This module defines the provider contract, the routing table and the
//! [`AiRouter`] that ties them to PII masking, retries and fallback.
//!
//! # Module Structure
//!
//! - `types`: Core keys (ProviderId, TaskType, ModelTarget)
//! - `rules`: Routing table and per-task policies
//! - `config`: Settings loaded from TOML and the environment
//! - `provider`: LlmProvider trait definition
//! - `registry`: Adapters keyed by ProviderId
//! - `retry`: Linear backoff schedule
//! - `stats`: Usage counters
//! - `mock`: Scripted provider for testing
//! - `router_impl`: AiRouter implementation
//! - `stream`: Streaming route

mod config;
mod mock;
mod provider;
mod registry;
mod retry;
mod router_impl;
mod rules;
mod stats;
mod stream;
mod types;


pub use config::{ProviderSettings, ProvidersSettings, RetrySettings, RouterSettings, ENV_PREFIX};
pub use mock::{ScriptedProvider, Step};
#[cfg(test)]
pub use provider::MockLlmProvider;
pub use provider::LlmProvider;
pub use registry::ProviderRegistry;
pub use retry::RetryPolicy;
pub use router_impl::{AiRouter, AiRouterBuilder, AvailabilityReport, RouteOptions};
pub use rules::{RoutePolicy, RoutingTable};
pub use stats::{format_rate, ProviderUsage, RouterStats};
pub use types::{ModelTarget, ProviderId, TaskType};
