//! Provider adapters, one type per backend
//!
//! Every adapter reads its configuration once at construction, shapes
//! requests for its own wire format and enforces the per-call timeout by
//! dropping the in-flight request future.

/// Anthropic Claude provider
pub mod anthropic;
/// Google Gemini provider
pub mod gemini;
/// Groq provider
pub mod groq;
/// OpenAI provider
pub mod openai;

use crate::error::{Error, Result};
use crate::router::ProviderId;
use crate::util::{extract_error_message, sanitize_api_error};
use reqwest::{Client, Response};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Connect timeout shared by every adapter client
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn build_client() -> Result<Client> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|e| Error::Network(e.to_string()))
}

/// Run `call`, giving up with [`Error::Timeout`] after `timeout_ms`.
///
/// The call future is dropped on expiry, which aborts its connection.
pub(crate) async fn with_deadline<T>(
    timeout_ms: u64,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(Duration::from_millis(timeout_ms), call).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(timeout_ms)),
    }
}

pub(crate) fn transport_error(e: reqwest::Error, timeout_ms: u64) -> Error {
    if e.is_timeout() {
        Error::Timeout(timeout_ms)
    } else {
        Error::Network(sanitize_api_error(&e.to_string()))
    }
}

/// Pass successful responses through; turn anything else into [`Error::Provider`]
pub(crate) async fn check_status(provider: ProviderId, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = sanitize_api_error(&extract_error_message(&body));
    warn!(%provider, status = status.as_u16(), "Provider returned an error status");

    Err(Error::Provider {
        provider,
        status: Some(status.as_u16()),
        message,
    })
}

/// Look up an abstract model key in an alias table
pub(crate) fn resolve_alias(aliases: &[(&str, &str)], model_key: &str) -> String {
    aliases
        .iter()
        .find(|(alias, _)| *alias == model_key)
        .map_or(model_key, |(_, model)| *model)
        .to_string()
}

/// API key from settings, else from the provider's environment variable
pub(crate) fn api_key_or_env(configured: Option<&str>, provider: ProviderId) -> String {
    configured
        .map(str::to_string)
        .or_else(|| std::env::var(provider.api_key_env()).ok())
        .unwrap_or_default()
}
