//! Groq - OpenAI-compatible provider
//!
//! Groq serves open-weight models behind the Chat Completions API, so this
//! adapter reuses the OpenAI wire types and only differs in request shape
//! (`max_tokens`), base URL and price list.


use crate::completion::{ChunkStream, CompletionOptions, CompletionResult};
use crate::cost::{
    CostBreakdown, ModelPricing, PriceTable, GROQ_GPT_OSS_INPUT_COST, GROQ_GPT_OSS_OUTPUT_COST,
    GROQ_LLAMA_70B_INPUT_COST, GROQ_LLAMA_70B_OUTPUT_COST, GROQ_LLAMA_8B_INPUT_COST,
    GROQ_LLAMA_8B_OUTPUT_COST,
};
use crate::error::{Error, Result};
use crate::providers::openai::types::{
    parse_chunk, parse_chunk_usage, ChatMessage, ChatRequest, StreamOptions,
};
use crate::providers::openai::{post_chat, read_chat};
use crate::providers::{api_key_or_env, build_client, resolve_alias, with_deadline};
use crate::router::{LlmProvider, ProviderId, ProviderSettings};
use crate::sse::{self, StreamSignal};
use crate::util::mask_api_key;
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use tracing::instrument;

/// Abstract model key → Groq model id
pub const MODEL_ALIASES: &[(&str, &str)] = &[
    ("llama-fast", "llama-3.1-8b-instant"),
    ("llama-large", "llama-3.3-70b-versatile"),
    ("gpt-oss", "openai/gpt-oss-120b"),
];

/// Default abstract model key
pub const DEFAULT_MODEL: &str = "llama-large";

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Compiled-in Groq prices; unknown models are charged as Llama 70B
#[must_use]
pub fn default_pricing() -> PriceTable {
    PriceTable::new(ModelPricing::new(
        GROQ_LLAMA_70B_INPUT_COST,
        GROQ_LLAMA_70B_OUTPUT_COST,
    ))
    .with_model(
        "llama-3.1-8b-instant",
        ModelPricing::new(GROQ_LLAMA_8B_INPUT_COST, GROQ_LLAMA_8B_OUTPUT_COST),
    )
    .with_model(
        "llama-3.3-70b-versatile",
        ModelPricing::new(GROQ_LLAMA_70B_INPUT_COST, GROQ_LLAMA_70B_OUTPUT_COST),
    )
    .with_model(
        "openai/gpt-oss-120b",
        ModelPricing::new(GROQ_GPT_OSS_INPUT_COST, GROQ_GPT_OSS_OUTPUT_COST),
    )
}

/// Groq provider configuration
#[derive(Clone)]
pub struct GroqConfig {
    /// Whether the adapter may be used
    pub enabled: bool,
    /// API key
    pub api_key: String,
    /// Base URL
    pub base_url: String,
    /// Price table
    pub pricing: PriceTable,
}

impl fmt::Debug for GroqConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroqConfig")
            .field("enabled", &self.enabled)
            .field("api_key", &mask_api_key(&self.api_key))
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GroqConfig {
    /// Create a new configuration
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            enabled: true,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            pricing: default_pricing(),
        }
    }

    /// Create from `GROQ_API_KEY`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GROQ_API_KEY")
            .map_err(|_| Error::NotConfigured("GROQ_API_KEY not set".to_string()))?;
        Ok(Self::new(api_key))
    }

    /// Build from router settings
    #[must_use]
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        let api_key = api_key_or_env(settings.api_key.as_deref(), ProviderId::Groq);
        let mut config = Self::new(api_key).with_enabled(settings.enabled);
        if let Some(url) = &settings.base_url {
            config.base_url = url.clone();
        }
        if let Some(pricing) = &settings.pricing {
            config.pricing = pricing.clone();
        }
        config
    }

    /// Set base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Enable or disable the adapter
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Replace the price table
    #[must_use]
    pub fn with_pricing(mut self, pricing: PriceTable) -> Self {
        self.pricing = pricing;
        self
    }
}

fn parse_stream_chunk(data: &str) -> Result<StreamSignal> {
    parse_chunk(ProviderId::Groq, data)
}

/// Groq provider
pub struct GroqProvider {
    client: Client,
    config: GroqConfig,
}

impl GroqProvider {
    /// Create a new Groq provider
    pub fn new(config: GroqConfig) -> Result<Self> {
        let client = build_client()?;
        Ok(Self { client, config })
    }

    /// Create from environment
    pub fn from_env() -> Result<Self> {
        Self::new(GroqConfig::from_env()?)
    }

    pub(crate) fn build_request(
        &self,
        system_prompt: &str,
        user_input: &str,
        options: &CompletionOptions,
        stream: bool,
    ) -> ChatRequest {
        let model_key: &str = if options.model.is_empty() {
            DEFAULT_MODEL
        } else {
            &options.model
        };

        ChatRequest {
            model: self.resolve_model(model_key),
            messages: ChatMessage::conversation(system_prompt, user_input),
            temperature: options.temperature,
            max_completion_tokens: None,
            max_tokens: options.max_tokens,
            stream,
            stream_options: StreamOptions::for_stream(stream),
        }
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }
}

#[async_trait::async_trait]
impl LlmProvider for GroqProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Groq
    }

    fn is_available(&self) -> bool {
        self.config.enabled && !self.config.api_key.is_empty()
    }

    fn resolve_model(&self, model_key: &str) -> String {
        resolve_alias(MODEL_ALIASES, model_key)
    }

    #[instrument(skip_all, fields(model = %options.model))]
    async fn complete(
        &self,
        system_prompt: &str,
        user_input: &str,
        options: &CompletionOptions,
    ) -> Result<CompletionResult> {
        if !self.is_available() {
            return Err(Error::NotConfigured("groq".to_string()));
        }
        let request = self.build_request(system_prompt, user_input, options, false);
        let url = self.url();

        with_deadline(options.timeout_ms, async {
            let response = post_chat(
                &self.client,
                ProviderId::Groq,
                &url,
                &self.config.api_key,
                &request,
                options.timeout_ms,
            )
            .await?;
            read_chat(response, ProviderId::Groq, &options.model).await
        })
        .await
    }

    #[instrument(skip_all, fields(model = %options.model))]
    async fn stream(
        &self,
        system_prompt: &str,
        user_input: &str,
        options: &CompletionOptions,
    ) -> Result<ChunkStream> {
        if !self.is_available() {
            return Err(Error::NotConfigured("groq".to_string()));
        }
        let request = self.build_request(system_prompt, user_input, options, true);
        let url = self.url();

        let response = with_deadline(
            options.timeout_ms,
            post_chat(
                &self.client,
                ProviderId::Groq,
                &url,
                &self.config.api_key,
                &request,
                options.timeout_ms,
            ),
        )
        .await?;

        let events = sse::data_stream(response, Duration::from_millis(options.timeout_ms));
        Ok(sse::chunk_stream(events, parse_stream_chunk, parse_chunk_usage))
    }

    fn calculate_cost(&self, input_tokens: u32, output_tokens: u32, model: &str) -> CostBreakdown {
        self.config
            .pricing
            .calculate_cost(&self.resolve_model(model), input_tokens, output_tokens)
    }
}
