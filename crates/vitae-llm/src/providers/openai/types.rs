//! Chat Completions wire format
//!
//! Shared with every OpenAI-compatible backend (Groq).

use crate::completion::TokenUsage;
use crate::error::{Error, Result};
use crate::router::ProviderId;
use crate::sse::StreamSignal;
use crate::util::sanitize_api_error;
use serde::{Deserialize, Serialize};

/// Sentinel payload closing a Chat Completions stream
pub(crate) const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// OpenAI reasoning-era models only accept this name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<StreamOptions>,
}

/// Asks for a final usage chunk on streamed responses
#[derive(Debug, Clone, Copy, Serialize)]
pub(crate) struct StreamOptions {
    pub include_usage: bool,
}

impl StreamOptions {
    pub(crate) fn for_stream(stream: bool) -> Option<Self> {
        stream.then_some(Self {
            include_usage: true,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    /// System prompt (omitted when empty) followed by the user turn
    pub(crate) fn conversation(system_prompt: &str, user_input: &str) -> Vec<Self> {
        let mut messages = Vec::with_capacity(2);
        if !system_prompt.is_empty() {
            messages.push(Self {
                role: "system",
                content: system_prompt.to_string(),
            });
        }
        messages.push(Self {
            role: "user",
            content: user_input.to_string(),
        });
        messages
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<ChatUsage>,
}

impl ChatResponse {
    /// Text of the first choice
    pub(crate) fn text(&self) -> Result<String> {
        self.choices
            .first()
            .map(|choice| choice.message.content.clone().unwrap_or_default())
            .ok_or_else(|| Error::InvalidResponse("response has no choices".to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChatUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

impl ChatUsage {
    pub(crate) fn to_usage(&self) -> TokenUsage {
        TokenUsage::new(self.prompt_tokens, self.completion_tokens)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub error: Option<ChunkError>,
    #[serde(default)]
    pub usage: Option<ChatUsage>,
    /// Groq reports stream usage here
    #[serde(default)]
    pub x_groq: Option<GroqChunkExtra>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GroqChunkExtra {
    #[serde(default)]
    pub usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChunkError {
    #[serde(default)]
    pub message: String,
}

/// Map one Chat Completions stream payload to a signal
pub(crate) fn parse_chunk(provider: ProviderId, data: &str) -> Result<StreamSignal> {
    if data.trim() == DONE_MARKER {
        return Ok(StreamSignal::Done);
    }

    let chunk: ChatChunk =
        serde_json::from_str(data).map_err(|e| Error::InvalidResponse(e.to_string()))?;

    if let Some(error) = chunk.error {
        return Err(Error::Provider {
            provider,
            status: None,
            message: sanitize_api_error(&error.message),
        });
    }

    let text = chunk
        .choices
        .into_iter()
        .filter_map(|choice| choice.delta.content)
        .collect::<String>();
    Ok(StreamSignal::Text(text))
}

/// Usage reported by a stream payload, if any
pub(crate) fn parse_chunk_usage(data: &str) -> Option<TokenUsage> {
    if data.trim() == DONE_MARKER {
        return None;
    }
    let chunk: ChatChunk = serde_json::from_str(data).ok()?;
    chunk
        .usage
        .or_else(|| chunk.x_groq.and_then(|extra| extra.usage))
        .map(|usage| usage.to_usage())
}
