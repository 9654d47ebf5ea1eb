//! Error types for vitae-llm

use crate::router::ProviderId;
use thiserror::Error;

/// Routing and provider error type
#[derive(Debug, Error)]
pub enum Error {
    /// Provider disabled or missing credentials
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// Backend answered with a non-success status
    #[error("{provider} api error: {message}")]
    Provider {
        /// Backend that failed
        provider: ProviderId,
        /// HTTP status, when one was received
        status: Option<u16>,
        /// Sanitized backend message
        message: String,
    },

    /// Body could not be decoded, or a stream ended early
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Transport failure
    #[error("network error: {0}")]
    Network(String),

    /// Timeout
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// Neither the primary nor the fallback provider is available
    #[error("no provider available for task '{task}'")]
    NoProviderAvailable {
        /// Task being routed
        task: String,
    },

    /// Every attempted provider exhausted its retries
    #[error("all providers failed for task '{task}': {source}")]
    AllProvidersFailed {
        /// Task being routed
        task: String,
        /// Last underlying error
        source: Box<Error>,
    },

    /// Caller cancelled the request
    #[error("request cancelled")]
    Cancelled,

    /// Invalid configuration or routing table
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether another attempt against the same provider may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Provider { .. } | Self::Network(_) | Self::InvalidResponse(_)
        )
    }

    /// HTTP status carried by a provider error
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Provider { status, .. } => *status,
            _ => None,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
