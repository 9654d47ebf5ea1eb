//! OpenAI - Chat Completions provider
//!
//! This module implements the OpenAI provider over plain reqwest. The wire
//! types in [`types`] are reused by OpenAI-compatible backends.

pub(crate) mod types;


use crate::completion::{ChunkStream, CompletionOptions, CompletionResult, TokenUsage};
use crate::cost::{
    CostBreakdown, ModelPricing, PriceTable, GPT4O_MINI_INPUT_COST, GPT4O_MINI_OUTPUT_COST,
    GPT5_INPUT_COST, GPT5_NANO_INPUT_COST, GPT5_NANO_OUTPUT_COST, GPT5_OUTPUT_COST,
};
use crate::error::{Error, Result};
use crate::providers::{
    api_key_or_env, build_client, check_status, resolve_alias, transport_error, with_deadline,
};
use crate::router::{LlmProvider, ProviderId, ProviderSettings};
use crate::sse::{self, StreamSignal};
use crate::util::mask_api_key;
use reqwest::{Client, Response};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};
use types::{
    parse_chunk, parse_chunk_usage, ChatMessage, ChatRequest, ChatResponse, ChatUsage,
    StreamOptions,
};

/// Abstract model key → OpenAI model id
///
/// GPT-5 family pricing (per 1M tokens):
/// - gpt-5-nano: $0.05/$0.40
/// - gpt-5: $1.25/$10.00
/// - gpt-4o-mini: $0.15/$0.60 (legacy, still cheap and fast)
pub const MODEL_ALIASES: &[(&str, &str)] = &[
    ("gpt-nano", "gpt-5-nano"),
    ("gpt-mini", "gpt-4o-mini"),
    ("gpt", "gpt-5"),
];

/// Default abstract model key
pub const DEFAULT_MODEL: &str = "gpt-mini";

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Compiled-in OpenAI prices; unknown models are charged as GPT-5
#[must_use]
pub fn default_pricing() -> PriceTable {
    PriceTable::new(ModelPricing::new(GPT5_INPUT_COST, GPT5_OUTPUT_COST))
        .with_model(
            "gpt-5-nano",
            ModelPricing::new(GPT5_NANO_INPUT_COST, GPT5_NANO_OUTPUT_COST),
        )
        .with_model(
            "gpt-4o-mini",
            ModelPricing::new(GPT4O_MINI_INPUT_COST, GPT4O_MINI_OUTPUT_COST),
        )
        .with_model("gpt-5", ModelPricing::new(GPT5_INPUT_COST, GPT5_OUTPUT_COST))
}

/// Configuration for the OpenAI provider
#[derive(Clone)]
pub struct OpenAiConfig {
    /// Whether the adapter may be used
    pub enabled: bool,
    /// API key for authentication
    pub api_key: String,
    /// Base URL (for proxies or Azure-style gateways)
    pub base_url: String,
    /// Price table
    pub pricing: PriceTable,
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("enabled", &self.enabled)
            .field("api_key", &mask_api_key(&self.api_key))
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAiConfig {
    /// Creates a new configuration with the given API key
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            enabled: true,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            pricing: default_pricing(),
        }
    }

    /// Creates configuration from `OPENAI_API_KEY` and `OPENAI_BASE_URL`
    ///
    /// # Errors
    /// Returns [`Error::NotConfigured`] if the key is not set
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| Error::NotConfigured("OPENAI_API_KEY not set".to_string()))?;
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self::new(api_key).with_base_url(base_url))
    }

    /// Build from router settings
    #[must_use]
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        let api_key = api_key_or_env(settings.api_key.as_deref(), ProviderId::OpenAi);
        let mut config = Self::new(api_key).with_enabled(settings.enabled);
        if let Some(url) = &settings.base_url {
            config.base_url = url.clone();
        }
        if let Some(pricing) = &settings.pricing {
            config.pricing = pricing.clone();
        }
        config
    }

    /// Sets a custom base URL
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

/// Send a Chat Completions request with Bearer auth
pub(crate) async fn post_chat(
    client: &Client,
    provider: ProviderId,
    url: &str,
    api_key: &str,
    request: &ChatRequest,
    timeout_ms: u64,
) -> Result<Response> {
    debug!(%provider, "Sending chat completion request: {}", url);

    let response = client
        .post(url)
        .bearer_auth(api_key)
        .json(request)
        .send()
        .await
        .map_err(|e| transport_error(e, timeout_ms))?;

    check_status(provider, response).await
}

/// Read a non-streaming Chat Completions body
pub(crate) async fn read_chat(
    response: Response,
    provider: ProviderId,
    model_key: &str,
) -> Result<CompletionResult> {
    let body: ChatResponse = response
        .json()
        .await
        .map_err(|e| Error::InvalidResponse(e.to_string()))?;

    let usage = body
        .usage
        .as_ref()
        .map_or_else(TokenUsage::default, ChatUsage::to_usage);

    Ok(CompletionResult {
        content: body.text()?,
        provider,
        model: model_key.to_string(),
        usage,
    })
}

fn parse_stream_chunk(data: &str) -> Result<StreamSignal> {
    parse_chunk(ProviderId::OpenAi, data)
}

/// OpenAI provider
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    /// Creates a new OpenAI provider
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = build_client()?;
        Ok(Self { client, config })
    }

    /// Creates a provider from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAiConfig::from_env()?)
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
            max_completion_tokens: options.max_tokens,
            max_tokens: None,
            stream,
            stream_options: StreamOptions::for_stream(stream),
        }
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    fn ensure_available(&self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(Error::NotConfigured("openai".to_string()))
        }
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAi
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
        self.ensure_available()?;
        let request = self.build_request(system_prompt, user_input, options, false);
        let url = self.url();

        with_deadline(options.timeout_ms, async {
            let response = post_chat(
                &self.client,
                ProviderId::OpenAi,
                &url,
                &self.config.api_key,
                &request,
                options.timeout_ms,
            )
            .await?;
            read_chat(response, ProviderId::OpenAi, &options.model).await
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
        self.ensure_available()?;
        let request = self.build_request(system_prompt, user_input, options, true);
        let url = self.url();

        let response = with_deadline(
            options.timeout_ms,
            post_chat(
                &self.client,
                ProviderId::OpenAi,
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
