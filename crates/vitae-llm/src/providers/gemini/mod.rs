//! Google Gemini provider
//!
//! Talks to the Generative Language API with an `x-goog-api-key` header.

/// Provider implementation
pub mod provider;
/// API types and configuration
pub mod types;


pub use provider::GeminiProvider;
pub use types::{default_pricing, GeminiConfig, DEFAULT_MODEL, MODEL_ALIASES};
