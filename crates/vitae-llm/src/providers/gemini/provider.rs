//! Gemini provider implementation

use super::types::{
    GeminiConfig, GeminiContent, GeminiRequest, GeminiResponse, GenerationConfig, UsageMetadata,
    DEFAULT_MODEL, MODEL_ALIASES,
};
use crate::completion::{ChunkStream, CompletionOptions, CompletionResult, TokenUsage};
use crate::cost::CostBreakdown;
use crate::error::{Error, Result};
use crate::providers::{build_client, check_status, resolve_alias, transport_error, with_deadline};
use crate::router::{LlmProvider, ProviderId};
use crate::sse::{self, StreamSignal};
use crate::util::sanitize_api_error;
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, instrument};

/// Google Gemini provider
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = build_client()?;
        Ok(Self { client, config })
    }

    /// Create from environment
    pub fn from_env() -> Result<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    fn model_for(&self, options: &CompletionOptions) -> String {
        if options.model.is_empty() {
            self.resolve_model(DEFAULT_MODEL)
        } else {
            self.resolve_model(&options.model)
        }
    }

    pub(crate) fn build_request(
        system_prompt: &str,
        user_input: &str,
        options: &CompletionOptions,
    ) -> GeminiRequest {
        let generation_config = (options.temperature.is_some() || options.max_tokens.is_some())
            .then(|| GenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_tokens,
            });

        GeminiRequest {
            contents: vec![GeminiContent::text(Some("user"), user_input)],
            system_instruction: (!system_prompt.is_empty())
                .then(|| GeminiContent::text(None, system_prompt)),
            generation_config,
        }
    }

    pub(crate) fn endpoint(&self, model: &str, stream: bool) -> String {
        if stream {
            format!(
                "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
                self.config.base_url, model
            )
        } else {
            format!("{}/v1beta/models/{}:generateContent", self.config.base_url, model)
        }
    }

    async fn send_request(
        &self,
        url: &str,
        request: &GeminiRequest,
        timeout_ms: u64,
    ) -> Result<Response> {
        debug!("Sending request to Gemini: {}", url);

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout_ms))?;

        check_status(ProviderId::Gemini, response).await
    }

    fn ensure_available(&self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(Error::NotConfigured("gemini".to_string()))
        }
    }
}

fn first_candidate_text(response: &GeminiResponse) -> (String, bool) {
    response.candidates.first().map_or((String::new(), false), |candidate| {
        let text = candidate
            .content
            .as_ref()
            .map(GeminiContent::joined_text)
            .unwrap_or_default();
        (text, candidate.finish_reason.is_some())
    })
}

/// Map one `streamGenerateContent` event to a signal.
///
/// Gemini has no end marker; the chunk carrying a `finishReason` is the last.
pub(crate) fn parse_stream_event(data: &str) -> Result<StreamSignal> {
    let event: GeminiResponse =
        serde_json::from_str(data).map_err(|e| Error::InvalidResponse(e.to_string()))?;

    if let Some(error) = event.error {
        return Err(Error::Provider {
            provider: ProviderId::Gemini,
            status: None,
            message: sanitize_api_error(&error.message),
        });
    }

    let (text, finished) = first_candidate_text(&event);
    Ok(if finished {
        StreamSignal::Last(text)
    } else {
        StreamSignal::Text(text)
    })
}

/// Running usage totals, repeated on stream events
pub(crate) fn parse_stream_usage(data: &str) -> Option<TokenUsage> {
    let event: GeminiResponse = serde_json::from_str(data).ok()?;
    event.usage_metadata.as_ref().map(UsageMetadata::to_usage)
}

#[async_trait::async_trait]
impl LlmProvider for GeminiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Gemini
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
        let request = Self::build_request(system_prompt, user_input, options);
        let url = self.endpoint(&self.model_for(options), false);

        with_deadline(options.timeout_ms, async {
            let response = self.send_request(&url, &request, options.timeout_ms).await?;
            let body: GeminiResponse = response
                .json()
                .await
                .map_err(|e| Error::InvalidResponse(e.to_string()))?;

            if body.candidates.is_empty() {
                return Err(Error::InvalidResponse(
                    "No candidates in response".to_string(),
                ));
            }
            let (content, _) = first_candidate_text(&body);
            let usage = body
                .usage_metadata
                .as_ref()
                .map_or_else(TokenUsage::default, UsageMetadata::to_usage);

            Ok(CompletionResult {
                content,
                provider: ProviderId::Gemini,
                model: options.model.clone(),
                usage,
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
        let request = Self::build_request(system_prompt, user_input, options);
        let url = self.endpoint(&self.model_for(options), true);

        let response = with_deadline(
            options.timeout_ms,
            self.send_request(&url, &request, options.timeout_ms),
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
