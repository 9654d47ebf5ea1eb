//! Anthropic - Claude Messages API provider
//!
//! This module implements the Anthropic Claude provider using reqwest.

/// Provider implementation
pub mod provider;
/// API types and configuration
pub mod types;


pub use provider::AnthropicProvider;
pub use types::{default_pricing, AnthropicConfig, DEFAULT_MODEL, MODEL_ALIASES};
