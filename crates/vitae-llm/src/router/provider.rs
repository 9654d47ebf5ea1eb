//! LLM Provider trait definition
//!
//! This module defines the core LlmProvider trait that all adapters implement.

use super::types::ProviderId;
use crate::completion::{ChunkStream, CompletionOptions, CompletionResult};
use crate::cost::CostBreakdown;
use crate::error::Result;

/// Uniform contract over one remote text-generation backend
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Registry key of this adapter
    fn id(&self) -> ProviderId;

    /// Whether the adapter is enabled and holds credentials.
    ///
    /// Cheap and side-effect free.
    fn is_available(&self) -> bool;

    /// Translate an abstract model key into the backend model id.
    ///
    /// Unknown keys are returned unchanged.
    fn resolve_model(&self, model_key: &str) -> String;

    /// Issue one request and wait for the full answer.
    ///
    /// Must return [`Error::Timeout`](crate::Error::Timeout) rather than
    /// run past `options.timeout_ms`.
    async fn complete(
        &self,
        system_prompt: &str,
        user_input: &str,
        options: &CompletionOptions,
    ) -> Result<CompletionResult>;

    /// Issue one request and receive the answer incrementally.
    ///
    /// The stream ends when the backend signals completion. Token usage,
    /// when the backend reports it, arrives as a final
    /// [`StreamChunk::Usage`](crate::StreamChunk::Usage).
    async fn stream(
        &self,
        system_prompt: &str,
        user_input: &str,
        options: &CompletionOptions,
    ) -> Result<ChunkStream>;

    /// Price a call. Unknown models use the adapter's default price.
    fn calculate_cost(&self, input_tokens: u32, output_tokens: u32, model: &str) -> CostBreakdown;
}
