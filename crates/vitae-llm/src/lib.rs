//! Vitae LLM - AI request routing for the résumé editor
//!
//! This crate dispatches résumé tasks to remote text-generation providers:
//! - Router: task → provider policy, retries with backoff, fallback, usage stats
//! - Anthropic: Claude 4.5 family (Haiku, Sonnet, Opus)
//! - OpenAI: GPT-5 / GPT-4o family
//! - Gemini: Gemini 2.5 family (Flash-Lite, Flash, Pro)
//! - Groq: Llama and GPT-OSS on Groq inference
//!
//! User text is masked with `vitae-pii` before it leaves the process and
//! restored in the answer, on both the single-shot and streaming paths.
//!
//! ```no_run
//! use vitae_llm::{AiRouter, RouteOptions, RouterSettings, TaskType};
//!
//! # async fn run() -> vitae_llm::Result<()> {
//! let settings = RouterSettings::load(Some("config/vitae.toml".as_ref()))?;
//! let router = AiRouter::from_settings(&settings)?;
//!
//! let result = router
//!     .route(
//!         TaskType::IMPROVE_SUMMARY,
//!         "Rewrite this summary in a confident tone.",
//!         "Backend developer, reach me at jane@example.com",
//!         &RouteOptions::default(),
//!     )
//!     .await?;
//! println!("{} ({})", result.content, result.provider);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod completion;
pub mod cost;
pub mod error;
pub mod logging;
pub mod providers;
pub mod router;
pub(crate) mod sse;
pub mod util;

pub use completion::{
    ChunkStream, CompletionOptions, CompletionResult, StreamChunk, TextStream, TokenUsage,
};
pub use cost::{CostBreakdown, ModelPricing, PriceTable};
pub use error::{Error, Result};
pub use router::{
    AiRouter, AiRouterBuilder, AvailabilityReport, LlmProvider, ModelTarget, ProviderId,
    ProviderRegistry, ProviderSettings, ProvidersSettings, RetryPolicy, RetrySettings,
    RouteOptions, RoutePolicy, RouterSettings, RouterStats, RoutingTable, ScriptedProvider, Step,
    TaskType,
};

// Re-export provider types
pub use providers::anthropic::{AnthropicConfig, AnthropicProvider};
pub use providers::gemini::{GeminiConfig, GeminiProvider};
pub use providers::groq::{GroqConfig, GroqProvider};
pub use providers::openai::{OpenAiConfig, OpenAiProvider};
