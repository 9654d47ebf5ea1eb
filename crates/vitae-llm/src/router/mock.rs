//! Scripted provider for testing
//!
//! [`ScriptedProvider`] plays back a queue of [`Step`]s and records what it
//! was asked, so routing behaviour can be exercised without a network.

use super::provider::LlmProvider;
use super::types::ProviderId;
use crate::completion::{
    ChunkStream, CompletionOptions, CompletionResult, StreamChunk, TokenUsage,
};
use crate::cost::{CostBreakdown, ModelPricing, PriceTable};
use crate::error::{Error, Result};
use crate::providers::with_deadline;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Characters per chunk when echoing input as a stream
const ECHO_CHUNK_CHARS: usize = 3;

/// One scripted reaction
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Answer with this text (a single chunk when streaming)
    Reply(String),
    /// Answer with the user input exactly as received
    Echo,
    /// Answer with these chunks (concatenated for `complete`)
    Chunks(Vec<String>),
    /// Stream these chunks, then fail with a network error (`complete` fails at once)
    BrokenStream(Vec<String>),
    /// Fail with a provider error carrying this HTTP status
    Fail(u16),
    /// Fail with a timeout immediately
    Timeout,
    /// Report the provider as not configured
    NotConfigured,
    /// Never answer; the call's own deadline ends it
    Hang,
    /// Answer after the given number of milliseconds
    Delayed(u64, String),
}

impl Step {
    /// Shorthand for [`Step::Reply`]
    #[must_use]
    pub fn reply(text: impl Into<String>) -> Self {
        Self::Reply(text.into())
    }
}

/// In-process [`LlmProvider`] driven by a script
pub struct ScriptedProvider {
    id: ProviderId,
    available: AtomicBool,
    script: Mutex<VecDeque<Step>>,
    otherwise: Step,
    usage: Option<TokenUsage>,
    pricing: PriceTable,
    calls: AtomicU32,
    stream_calls: AtomicU32,
    inputs: Mutex<Vec<String>>,
    requests: Mutex<Vec<CompletionOptions>>,
}

impl ScriptedProvider {
    /// Provider that answers every call with `"<id> reply"`
    #[must_use]
    pub fn new(id: ProviderId) -> Self {
        Self {
            id,
            available: AtomicBool::new(true),
            script: Mutex::new(VecDeque::new()),
            otherwise: Step::Reply(format!("{id} reply")),
            usage: None,
            pricing: PriceTable::new(ModelPricing::new(1.0, 2.0)),
            calls: AtomicU32::new(0),
            stream_calls: AtomicU32::new(0),
            inputs: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Step used once the queue is empty
    #[must_use]
    pub fn always(mut self, step: Step) -> Self {
        self.otherwise = step;
        self
    }

    /// Queue a step for the next call
    #[must_use]
    pub fn then(self, step: Step) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(step);
        self
    }

    /// Start out unavailable
    #[must_use]
    pub fn unavailable(self) -> Self {
        self.set_available(false);
        self
    }

    /// Report this usage for every answer instead of an estimate.
    ///
    /// Streams only report usage when it is set.
    #[must_use]
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Replace the price table
    #[must_use]
    pub fn with_pricing(mut self, pricing: PriceTable) -> Self {
        self.pricing = pricing;
        self
    }

    /// Toggle availability
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of `complete` calls received
    #[must_use]
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of `stream` calls received
    #[must_use]
    pub fn stream_calls(&self) -> u32 {
        self.stream_calls.load(Ordering::SeqCst)
    }

    /// User inputs received, in order
    #[must_use]
    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Options received, in order
    #[must_use]
    pub fn requests(&self) -> Vec<CompletionOptions> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn next_step(&self, user_input: &str, options: &CompletionOptions) -> Step {
        self.inputs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(user_input.to_string());
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(options.clone());

        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| self.otherwise.clone())
    }

    fn answer(&self, prompt_len: usize, content: String, options: &CompletionOptions) -> CompletionResult {
        let usage = self.usage.unwrap_or_else(|| {
            TokenUsage::new(estimate_tokens(prompt_len), estimate_tokens(content.len()))
        });
        CompletionResult {
            content,
            provider: self.id,
            model: options.model.clone(),
            usage,
        }
    }

    fn failure(&self, status: u16) -> Error {
        Error::Provider {
            provider: self.id,
            status: Some(status),
            message: format!("scripted failure ({status})"),
        }
    }
}

fn estimate_tokens(len: usize) -> u32 {
    u32::try_from(len / 4).unwrap_or(u32::MAX).max(1)
}

fn echo_chunks(input: &str) -> Vec<String> {
    let chars: Vec<char> = input.chars().collect();
    chars
        .chunks(ECHO_CHUNK_CHARS)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[async_trait::async_trait]
impl LlmProvider for ScriptedProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn resolve_model(&self, model_key: &str) -> String {
        model_key.to_string()
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_input: &str,
        options: &CompletionOptions,
    ) -> Result<CompletionResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.is_available() {
            return Err(Error::NotConfigured(self.id.to_string()));
        }

        let step = self.next_step(user_input, options);
        let prompt_len = system_prompt.len() + user_input.len();

        with_deadline(options.timeout_ms, async move {
            match step {
                Step::Reply(text) => Ok(self.answer(prompt_len, text, options)),
                Step::Echo => Ok(self.answer(prompt_len, user_input.to_string(), options)),
                Step::Chunks(chunks) => Ok(self.answer(prompt_len, chunks.concat(), options)),
                Step::BrokenStream(_) => Err(Error::Network("connection reset".to_string())),
                Step::Fail(status) => Err(self.failure(status)),
                Step::Timeout => Err(Error::Timeout(options.timeout_ms)),
                Step::NotConfigured => Err(Error::NotConfigured(self.id.to_string())),
                Step::Hang => std::future::pending().await,
                Step::Delayed(ms, text) => {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    Ok(self.answer(prompt_len, text, options))
                }
            }
        })
        .await
    }

    async fn stream(
        &self,
        _system_prompt: &str,
        user_input: &str,
        options: &CompletionOptions,
    ) -> Result<ChunkStream> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        if !self.is_available() {
            return Err(Error::NotConfigured(self.id.to_string()));
        }

        let chunks = match self.next_step(user_input, options) {
            Step::Reply(text) => vec![text],
            Step::Echo => echo_chunks(user_input),
            Step::Chunks(chunks) => chunks,
            Step::BrokenStream(chunks) => {
                let broken = stream::iter(chunks.into_iter().map(|c| Ok(StreamChunk::Text(c))))
                    .chain(stream::once(async {
                        Err(Error::Network("connection reset".to_string()))
                    }));
                return Ok(broken.boxed());
            }
            Step::Fail(status) => return Err(self.failure(status)),
            Step::Timeout => return Err(Error::Timeout(options.timeout_ms)),
            Step::NotConfigured => return Err(Error::NotConfigured(self.id.to_string())),
            Step::Hang => {
                return with_deadline(options.timeout_ms, std::future::pending()).await;
            }
            Step::Delayed(ms, text) => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                vec![text]
            }
        };

        let usage = self.usage.map(StreamChunk::Usage);
        let items = chunks
            .into_iter()
            .map(StreamChunk::Text)
            .chain(usage)
            .map(Ok);
        Ok(stream::iter(items).boxed())
    }

    fn calculate_cost(&self, input_tokens: u32, output_tokens: u32, model: &str) -> CostBreakdown {
        self.pricing.calculate_cost(model, input_tokens, output_tokens)
    }
}
