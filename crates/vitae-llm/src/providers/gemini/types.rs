//! Gemini API types for requests and responses

use crate::completion::TokenUsage;
use crate::cost::{
    ModelPricing, PriceTable, GEMINI_FLASH_INPUT_COST, GEMINI_FLASH_LITE_INPUT_COST,
    GEMINI_FLASH_LITE_OUTPUT_COST, GEMINI_FLASH_OUTPUT_COST, GEMINI_PRO_INPUT_COST,
    GEMINI_PRO_OUTPUT_COST,
};
use crate::error::{Error, Result};
use crate::providers::api_key_or_env;
use crate::router::{ProviderId, ProviderSettings};
use crate::util::mask_api_key;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Abstract model key → Gemini model id
pub const MODEL_ALIASES: &[(&str, &str)] = &[
    ("gemini-flash-lite", "gemini-2.5-flash-lite"),
    ("gemini-flash", "gemini-2.5-flash"),
    ("gemini-pro", "gemini-2.5-pro"),
];

/// Default abstract model key
pub const DEFAULT_MODEL: &str = "gemini-flash";

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Compiled-in Gemini prices; unknown models are charged as Flash
#[must_use]
pub fn default_pricing() -> PriceTable {
    PriceTable::new(ModelPricing::new(GEMINI_FLASH_INPUT_COST, GEMINI_FLASH_OUTPUT_COST))
        .with_model(
            "gemini-2.5-flash-lite",
            ModelPricing::new(GEMINI_FLASH_LITE_INPUT_COST, GEMINI_FLASH_LITE_OUTPUT_COST),
        )
        .with_model(
            "gemini-2.5-flash",
            ModelPricing::new(GEMINI_FLASH_INPUT_COST, GEMINI_FLASH_OUTPUT_COST),
        )
        .with_model(
            "gemini-2.5-pro",
            ModelPricing::new(GEMINI_PRO_INPUT_COST, GEMINI_PRO_OUTPUT_COST),
        )
}

/// Gemini provider configuration
#[derive(Clone)]
pub struct GeminiConfig {
    /// Whether the adapter may be used
    pub enabled: bool,
    /// API key
    pub api_key: String,
    /// Base URL
    pub base_url: String,
    /// Price table
    pub pricing: PriceTable,
}

// SECURITY: Custom Debug implementation to mask API key
impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("enabled", &self.enabled)
            .field("api_key", &mask_api_key(&self.api_key))
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiConfig {
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

    /// Create from `GEMINI_API_KEY` (or `GOOGLE_API_KEY`)
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .map_err(|_| Error::NotConfigured("GEMINI_API_KEY not set".to_string()))?;
        Ok(Self::new(api_key))
    }

    /// Build from router settings
    #[must_use]
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        let api_key = api_key_or_env(settings.api_key.as_deref(), ProviderId::Gemini);
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

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

impl GeminiContent {
    pub(crate) fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![GeminiPart {
                text: Some(text.to_string()),
            }],
        }
    }

    /// Concatenated text of every part
    pub(crate) fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

// ============================================================================
// Response Types
// ============================================================================

/// Body of `generateContent` and of each `streamGenerateContent` event
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    pub error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Candidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    /// May be absent for empty responses
    #[serde(default)]
    pub candidates_token_count: Option<u32>,
}

impl UsageMetadata {
    pub(crate) fn to_usage(&self) -> TokenUsage {
        TokenUsage::new(self.prompt_token_count, self.candidates_token_count.unwrap_or(0))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeminiErrorDetail {
    #[serde(default)]
    pub message: String,
}
