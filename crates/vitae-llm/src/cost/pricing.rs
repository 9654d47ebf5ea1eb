//! Model Pricing - per-provider price tables
//!
//! Prices are USD per one million tokens. Each adapter ships its own
//! compiled-in table; configuration can replace it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Constants (per 1M tokens, USD)
// ============================================================================

// Anthropic Claude 4.5 family
/// Claude Haiku 4.5 input cost per 1M tokens
pub const CLAUDE_HAIKU_INPUT_COST: f64 = 1.00;
/// Claude Haiku 4.5 output cost per 1M tokens
pub const CLAUDE_HAIKU_OUTPUT_COST: f64 = 5.00;
/// Claude Sonnet 4.5 input cost per 1M tokens
pub const CLAUDE_SONNET_INPUT_COST: f64 = 3.00;
/// Claude Sonnet 4.5 output cost per 1M tokens
pub const CLAUDE_SONNET_OUTPUT_COST: f64 = 15.00;
/// Claude Opus 4.5 input cost per 1M tokens
pub const CLAUDE_OPUS_INPUT_COST: f64 = 5.00;
/// Claude Opus 4.5 output cost per 1M tokens
pub const CLAUDE_OPUS_OUTPUT_COST: f64 = 25.00;

// OpenAI
/// GPT-5 nano input cost per 1M tokens
pub const GPT5_NANO_INPUT_COST: f64 = 0.05;
/// GPT-5 nano output cost per 1M tokens
pub const GPT5_NANO_OUTPUT_COST: f64 = 0.40;
/// GPT-4o-mini input cost per 1M tokens
pub const GPT4O_MINI_INPUT_COST: f64 = 0.15;
/// GPT-4o-mini output cost per 1M tokens
pub const GPT4O_MINI_OUTPUT_COST: f64 = 0.60;
/// GPT-5 input cost per 1M tokens
pub const GPT5_INPUT_COST: f64 = 1.25;
/// GPT-5 output cost per 1M tokens
pub const GPT5_OUTPUT_COST: f64 = 10.00;

// Google Gemini 2.5
/// Gemini Flash-Lite input cost per 1M tokens
pub const GEMINI_FLASH_LITE_INPUT_COST: f64 = 0.10;
/// Gemini Flash-Lite output cost per 1M tokens
pub const GEMINI_FLASH_LITE_OUTPUT_COST: f64 = 0.40;
/// Gemini Flash input cost per 1M tokens
pub const GEMINI_FLASH_INPUT_COST: f64 = 0.30;
/// Gemini Flash output cost per 1M tokens
pub const GEMINI_FLASH_OUTPUT_COST: f64 = 2.50;
/// Gemini Pro input cost per 1M tokens
pub const GEMINI_PRO_INPUT_COST: f64 = 1.25;
/// Gemini Pro output cost per 1M tokens
pub const GEMINI_PRO_OUTPUT_COST: f64 = 10.00;

// Groq
/// Llama 3.1 8B instant input cost per 1M tokens
pub const GROQ_LLAMA_8B_INPUT_COST: f64 = 0.05;
/// Llama 3.1 8B instant output cost per 1M tokens
pub const GROQ_LLAMA_8B_OUTPUT_COST: f64 = 0.08;
/// Llama 3.3 70B versatile input cost per 1M tokens
pub const GROQ_LLAMA_70B_INPUT_COST: f64 = 0.59;
/// Llama 3.3 70B versatile output cost per 1M tokens
pub const GROQ_LLAMA_70B_OUTPUT_COST: f64 = 0.79;
/// GPT-OSS 120B input cost per 1M tokens
pub const GROQ_GPT_OSS_INPUT_COST: f64 = 0.15;
/// GPT-OSS 120B output cost per 1M tokens
pub const GROQ_GPT_OSS_OUTPUT_COST: f64 = 0.75;

const TOKENS_PER_MILLION: f64 = 1_000_000.0;

// ============================================================================
// Types
// ============================================================================

/// Cost of one call, split by direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Cost of prompt tokens (USD)
    pub input_cost: f64,
    /// Cost of generated tokens (USD)
    pub output_cost: f64,
    /// Sum of both (USD)
    pub total_cost: f64,
}

/// Model pricing information
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Cost per 1M input tokens (USD)
    pub input_cost_per_million: f64,
    /// Cost per 1M output tokens (USD)
    pub output_cost_per_million: f64,
}

impl ModelPricing {
    /// Create a pricing entry
    #[must_use]
    pub const fn new(input_cost_per_million: f64, output_cost_per_million: f64) -> Self {
        Self {
            input_cost_per_million,
            output_cost_per_million,
        }
    }

    /// Calculate cost for given token counts
    #[must_use]
    pub fn calculate_cost(&self, input_tokens: u32, output_tokens: u32) -> CostBreakdown {
        let input_cost = f64::from(input_tokens) * self.input_cost_per_million / TOKENS_PER_MILLION;
        let output_cost =
            f64::from(output_tokens) * self.output_cost_per_million / TOKENS_PER_MILLION;
        CostBreakdown {
            input_cost,
            output_cost,
            total_cost: input_cost + output_cost,
        }
    }
}

/// Per-provider price list with a mandatory default entry
///
/// Models missing from `models` are charged at `default`, so an unknown
/// model never fails cost calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    /// Price for models not listed below
    pub default: ModelPricing,
    /// Backend model id → price
    #[serde(default)]
    pub models: HashMap<String, ModelPricing>,
}

impl PriceTable {
    /// Create a table holding only a default entry
    #[must_use]
    pub fn new(default: ModelPricing) -> Self {
        Self {
            default,
            models: HashMap::new(),
        }
    }

    /// Add or replace one model's price
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>, pricing: ModelPricing) -> Self {
        self.models.insert(model.into(), pricing);
        self
    }

    /// Price for a model, or the default entry
    #[must_use]
    pub fn get(&self, model: &str) -> &ModelPricing {
        self.models.get(model).unwrap_or(&self.default)
    }

    /// Calculate the cost of a call against `model`
    #[must_use]
    pub fn calculate_cost(&self, model: &str, input_tokens: u32, output_tokens: u32) -> CostBreakdown {
        self.get(model).calculate_cost(input_tokens, output_tokens)
    }
}
