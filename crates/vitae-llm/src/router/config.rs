//! Router configuration
//!
//! Settings are layered with the `config` crate: an optional TOML file,
//! then `VITAE__`-prefixed environment variables
//! (`VITAE__PROVIDERS__GROQ__ENABLED=false`). A `.env` file is loaded first
//! when present.

use super::retry::RetryPolicy;
use super::rules::RoutingTable;
use super::types::ProviderId;
use crate::cost::PriceTable;
use crate::error::{Error, Result};
use crate::util::mask_api_key;
use ::config::builder::DefaultState;
use ::config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "VITAE";

fn default_enabled() -> bool {
    true
}

/// Settings for one provider adapter
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Whether the adapter may be used at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// API key; falls back to the provider's environment variable
    #[serde(default)]
    pub api_key: Option<String>,
    /// Override of the backend base URL
    #[serde(default)]
    pub base_url: Option<String>,
    /// Replacement price table
    #[serde(default)]
    pub pricing: Option<PriceTable>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: None,
            pricing: None,
        }
    }
}

// SECURITY: Custom Debug implementation to mask API key
impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("enabled", &self.enabled)
            .field("api_key", &self.api_key.as_deref().map(mask_api_key))
            .field("base_url", &self.base_url)
            .field("pricing", &self.pricing)
            .finish()
    }
}

/// Settings for every provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersSettings {
    /// Anthropic
    #[serde(default)]
    pub anthropic: ProviderSettings,
    /// OpenAI
    #[serde(default)]
    pub openai: ProviderSettings,
    /// Gemini
    #[serde(default)]
    pub gemini: ProviderSettings,
    /// Groq
    #[serde(default)]
    pub groq: ProviderSettings,
}

impl ProvidersSettings {
    /// Settings for one provider
    #[must_use]
    pub fn get(&self, id: ProviderId) -> &ProviderSettings {
        match id {
            ProviderId::Anthropic => &self.anthropic,
            ProviderId::OpenAi => &self.openai,
            ProviderId::Gemini => &self.gemini,
            ProviderId::Groq => &self.groq,
        }
    }
}

/// Backoff between attempts against one provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Delay unit; attempt `n` waits `n * base_delay_ms`
    #[serde(default = "RetrySettings::default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound on one delay
    #[serde(default = "RetrySettings::default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Add up to 25% random jitter
    #[serde(default)]
    pub jitter: bool,
}

impl RetrySettings {
    fn default_base_delay_ms() -> u64 {
        1_000
    }

    fn default_max_delay_ms() -> u64 {
        30_000
    }

    /// Build the retry policy these settings describe
    #[must_use]
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::linear(Duration::from_millis(self.base_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_jitter(self.jitter)
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            base_delay_ms: Self::default_base_delay_ms(),
            max_delay_ms: Self::default_max_delay_ms(),
            jitter: false,
        }
    }
}

/// Everything needed to build an [`AiRouter`](super::AiRouter)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouterSettings {
    /// Per-provider settings
    #[serde(default)]
    pub providers: ProvidersSettings,
    /// Backoff settings
    #[serde(default)]
    pub retry: RetrySettings,
    /// Task routing; a `default` policy is required when present
    #[serde(default)]
    pub routing: RoutingTable,
}

impl RouterSettings {
    /// Load from an optional TOML file plus `VITAE__*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        // A missing .env file is not an error
        let _ = dotenvy::dotenv();

        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!(path = %path.display(), "Loading router settings");
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        Self::from_builder(builder)
    }

    /// Parse settings from a TOML document
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Self::from_builder(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let settings: Self = builder
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| Error::Config(e.to_string()))?;
        settings.routing.validate()?;
        Ok(settings)
    }
}
