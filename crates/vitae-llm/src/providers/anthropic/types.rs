use crate::cost::{
    ModelPricing, PriceTable, CLAUDE_HAIKU_INPUT_COST, CLAUDE_HAIKU_OUTPUT_COST,
    CLAUDE_OPUS_INPUT_COST, CLAUDE_OPUS_OUTPUT_COST, CLAUDE_SONNET_INPUT_COST,
    CLAUDE_SONNET_OUTPUT_COST,
};
use crate::error::{Error, Result};
use crate::providers::api_key_or_env;
use crate::router::{ProviderId, ProviderSettings};
use crate::util::mask_api_key;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Anthropic API version
pub const API_VERSION: &str = "2023-06-01";

/// Abstract model key → Anthropic model id
pub const MODEL_ALIASES: &[(&str, &str)] = &[
    ("claude-haiku", "claude-haiku-4-5-20251001"),
    ("claude-sonnet", "claude-sonnet-4-5-20250929"),
    ("claude-opus", "claude-opus-4-5-20251101"),
];

/// Default abstract model key
pub const DEFAULT_MODEL: &str = "claude-haiku";

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// The Messages API requires `max_tokens`
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Compiled-in Claude prices; unknown models are charged as Sonnet
#[must_use]
pub fn default_pricing() -> PriceTable {
    PriceTable::new(ModelPricing::new(CLAUDE_SONNET_INPUT_COST, CLAUDE_SONNET_OUTPUT_COST))
        .with_model(
            "claude-haiku-4-5-20251001",
            ModelPricing::new(CLAUDE_HAIKU_INPUT_COST, CLAUDE_HAIKU_OUTPUT_COST),
        )
        .with_model(
            "claude-sonnet-4-5-20250929",
            ModelPricing::new(CLAUDE_SONNET_INPUT_COST, CLAUDE_SONNET_OUTPUT_COST),
        )
        .with_model(
            "claude-opus-4-5-20251101",
            ModelPricing::new(CLAUDE_OPUS_INPUT_COST, CLAUDE_OPUS_OUTPUT_COST),
        )
}

/// Anthropic provider configuration
#[derive(Clone)]
pub struct AnthropicConfig {
    /// Whether the adapter may be used
    pub enabled: bool,
    /// API key (empty when not configured)
    pub api_key: String,
    /// Base URL
    pub base_url: String,
    /// `max_tokens` sent when the caller gives none
    pub default_max_tokens: u32,
    /// Price table
    pub pricing: PriceTable,
}

// SECURITY: Custom Debug implementation to mask API key
impl fmt::Debug for AnthropicConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicConfig")
            .field("enabled", &self.enabled)
            .field("api_key", &mask_api_key(&self.api_key))
            .field("base_url", &self.base_url)
            .field("default_max_tokens", &self.default_max_tokens)
            .finish_non_exhaustive()
    }
}

impl AnthropicConfig {
    /// Create a new configuration with an API key
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            enabled: true,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            default_max_tokens: DEFAULT_MAX_TOKENS,
            pricing: default_pricing(),
        }
    }

    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| Error::NotConfigured("ANTHROPIC_API_KEY not set".to_string()))?;
        let base_url =
            std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Ok(Self::new(api_key).with_base_url(base_url))
    }

    /// Build from router settings; a missing key leaves the adapter unavailable
    #[must_use]
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        let api_key = api_key_or_env(settings.api_key.as_deref(), ProviderId::Anthropic);
        let mut config = Self::new(api_key).with_enabled(settings.enabled);
        if let Some(url) = &settings.base_url {
            config.base_url = url.clone();
        }
        if let Some(pricing) = &settings.pricing {
            config.pricing = pricing.clone();
        }
        config
    }

    /// Set the base URL
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

    /// Set the default max tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.default_max_tokens = max_tokens;
        self
    }

    /// Replace the price table
    #[must_use]
    pub fn with_pricing(mut self, pricing: PriceTable) -> Self {
        self.pricing = pricing;
        self
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct AnthropicRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnthropicMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnthropicResponse {
    pub content: Vec<ResponseContentBlock>,
    pub usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ResponseContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AnthropicUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

/// One `data:` payload of a Messages stream
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum StreamEvent {
    MessageStart {
        message: StreamMessage,
    },
    ContentBlockDelta {
        delta: StreamDelta,
    },
    MessageDelta {
        #[serde(default)]
        usage: AnthropicUsage,
    },
    MessageStop,
    Error {
        error: StreamError,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamMessage {
    #[serde(default)]
    pub usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamDelta {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamError {
    #[serde(default)]
    pub message: String,
}
