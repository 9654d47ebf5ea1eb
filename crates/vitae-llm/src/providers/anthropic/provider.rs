use super::types::{
    AnthropicConfig, AnthropicMessage, AnthropicRequest, AnthropicResponse, ResponseContentBlock,
    StreamEvent, API_VERSION, DEFAULT_MODEL, MODEL_ALIASES,
};
use crate::completion::{ChunkStream, CompletionOptions, CompletionResult, TokenUsage};
use crate::cost::CostBreakdown;
use crate::error::{Error, Result};
use crate::providers::{build_client, check_status, resolve_alias, transport_error, with_deadline};
use crate::router::{LlmProvider, ProviderId};
use crate::sse::{self, StreamSignal};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, instrument};

/// Anthropic Claude provider
pub struct AnthropicProvider {
    pub(crate) client: Client,
    pub(crate) config: AnthropicConfig,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        let client = build_client()?;
        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let config = AnthropicConfig::from_env()?;
        Self::new(config)
    }

    fn ensure_available(&self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(Error::NotConfigured("anthropic".to_string()))
        }
    }

    pub(crate) fn build_request(
        &self,
        system_prompt: &str,
        user_input: &str,
        options: &CompletionOptions,
        stream: bool,
    ) -> AnthropicRequest {
        let model_key: &str = if options.model.is_empty() {
            DEFAULT_MODEL
        } else {
            &options.model
        };

        AnthropicRequest {
            model: self.resolve_model(model_key),
            max_tokens: options.max_tokens.unwrap_or(self.config.default_max_tokens),
            system: (!system_prompt.is_empty()).then(|| system_prompt.to_string()),
            messages: vec![AnthropicMessage {
                role: "user",
                content: user_input.to_string(),
            }],
            temperature: options.temperature,
            stream,
        }
    }

    /// Send request to Anthropic API
    async fn send_request(&self, request: &AnthropicRequest, timeout_ms: u64) -> Result<Response> {
        let url = format!("{}/v1/messages", self.config.base_url);

        debug!("Sending request to Anthropic: {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout_ms))?;

        check_status(ProviderId::Anthropic, response).await
    }
}

/// Map one Messages stream payload to a signal
pub(crate) fn parse_stream_event(data: &str) -> Result<StreamSignal> {
    let event: StreamEvent =
        serde_json::from_str(data).map_err(|e| Error::InvalidResponse(e.to_string()))?;

    match event {
        StreamEvent::ContentBlockDelta { delta } => {
            Ok(StreamSignal::Text(delta.text.unwrap_or_default()))
        }
        StreamEvent::MessageStop => Ok(StreamSignal::Done),
        StreamEvent::MessageStart { .. } | StreamEvent::MessageDelta { .. } => {
            Ok(StreamSignal::Skip)
        }
        StreamEvent::Error { error } => Err(Error::Provider {
            provider: ProviderId::Anthropic,
            status: None,
            message: crate::util::sanitize_api_error(&error.message),
        }),
        StreamEvent::Other => Ok(StreamSignal::Skip),
    }
}

/// Token counts carried by `message_start` (input) and `message_delta` (output)
pub(crate) fn parse_stream_usage(data: &str) -> Option<TokenUsage> {
    let usage = match serde_json::from_str::<StreamEvent>(data).ok()? {
        StreamEvent::MessageStart { message } => message.usage,
        StreamEvent::MessageDelta { usage } => usage,
        _ => return None,
    };
    Some(TokenUsage::new(usage.input_tokens, usage.output_tokens))
}

#[async_trait::async_trait]
impl LlmProvider for AnthropicProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Anthropic
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

        with_deadline(options.timeout_ms, async {
            let response = self.send_request(&request, options.timeout_ms).await?;
            let body: AnthropicResponse = response
                .json()
                .await
                .map_err(|e| Error::InvalidResponse(e.to_string()))?;

            let content = body
                .content
                .iter()
                .filter_map(|block| match block {
                    ResponseContentBlock::Text { text } => Some(text.as_str()),
                    ResponseContentBlock::Other => None,
                })
                .collect::<String>();

            Ok(CompletionResult {
                content,
                provider: ProviderId::Anthropic,
                model: options.model.clone(),
                usage: TokenUsage::new(body.usage.input_tokens, body.usage.output_tokens),
            })
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

        let response = with_deadline(
            options.timeout_ms,
            self.send_request(&request, options.timeout_ms),
        )
        .await?;

        let events = sse::data_stream(response, Duration::from_millis(options.timeout_ms));
        Ok(sse::chunk_stream(events, parse_stream_event, parse_stream_usage))
    }

    fn calculate_cost(&self, input_tokens: u32, output_tokens: u32, model: &str) -> CostBreakdown {
        self.config
            .pricing
            .calculate_cost(&self.resolve_model(model), input_tokens, output_tokens)
    }
}
