//! Request and response types shared by every provider

use crate::error::Result;
use crate::router::ProviderId;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Default timeout applied when a caller builds options by hand
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Token usage information
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens
    pub input_tokens: u32,
    /// Generated tokens
    pub output_tokens: u32,
    /// Sum of both
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Build usage from input and output counts
    #[must_use]
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens.saturating_add(output_tokens),
        }
    }

    /// Field-wise maximum of two cumulative usage reports
    #[must_use]
    pub fn merged(self, other: Self) -> Self {
        Self::new(
            self.input_tokens.max(other.input_tokens),
            self.output_tokens.max(other.output_tokens),
        )
    }
}

/// Per-call options handed to a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    /// Abstract model key (`claude-haiku`) or a backend model id
    pub model: String,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Upper bound on generated tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Hard bound on the call, in milliseconds
    pub timeout_ms: u64,
}

impl CompletionOptions {
    /// Options for a model with the default timeout
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            max_tokens: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

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

    /// Set the timeout
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// Result of a completed request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResult {
    /// Generated text
    pub content: String,
    /// Provider that produced it
    pub provider: ProviderId,
    /// Abstract model key that was requested
    pub model: String,
    /// Token usage reported by the backend
    pub usage: TokenUsage,
}

/// Incremental text output of a routed streaming call
pub type TextStream = BoxStream<'static, Result<String>>;

/// One item of a provider stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    /// Generated text
    Text(String),
    /// Final token usage, sent once after the last text chunk
    Usage(TokenUsage),
}

/// Incremental output of [`LlmProvider::stream`](crate::LlmProvider::stream)
pub type ChunkStream = BoxStream<'static, Result<StreamChunk>>;
