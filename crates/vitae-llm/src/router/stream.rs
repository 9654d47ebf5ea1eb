//! Streaming route
//!
//! Same provider selection as [`AiRouter::route`], without retries. A
//! primary stream that fails to open, or breaks before its completion
//! signal, restarts the request on the fallback. Chunks already yielded are
//! not retracted.

use super::registry::ProviderRegistry;
use super::router_impl::{call_options, no_provider_available, AiRouter, RouteOptions};
use super::rules::RoutePolicy;
use super::stats::StatsRecorder;
use super::types::{ModelTarget, TaskType};
use crate::completion::{ChunkStream, StreamChunk, TextStream, TokenUsage};
use crate::error::{Error, Result};
use futures::stream;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument, Span};
use uuid::Uuid;
use vitae_pii::{Masked, StreamUnmasker};

enum Stage {
    /// Not polled yet
    Pending,
    OpenPrimary,
    StreamingPrimary,
    OpenFallback { primary_error: Option<Error> },
    StreamingFallback,
    Finished,
}

/// Everything needed to open a provider stream; shared across awaits
struct StreamRequest {
    providers: Arc<ProviderRegistry>,
    task: TaskType,
    policy: RoutePolicy,
    system_prompt: String,
    input: String,
    options: RouteOptions,
}

impl StreamRequest {
    async fn open(&self, target: &ModelTarget) -> Result<ChunkStream> {
        let provider = self
            .providers
            .get(target.provider)
            .filter(|provider| provider.is_available())
            .ok_or_else(|| Error::NotConfigured(target.provider.to_string()))?;

        let options = call_options(target, &self.policy, &self.options);
        provider
            .stream(&self.system_prompt, &self.input, &options)
            .await
    }
}

struct StreamRun {
    request: StreamRequest,
    stats: Arc<StatsRecorder>,
    unmasker: StreamUnmasker,
    stage: Stage,
    active: Option<ChunkStream>,
    usage: Option<TokenUsage>,
    span: Span,
}

impl AiRouter {
    /// Route a request and receive the answer incrementally.
    ///
    /// Nothing is sent until the stream is first polled. Outbound text is
    /// masked, and chunks are unmasked as they arrive, with tokens split
    /// across chunks reassembled first. When every provider fails, the
    /// stream yields one error item and ends. Dropping the stream aborts
    /// the backend call.
    pub fn route_stream(
        &self,
        task_type: impl Into<TaskType>,
        system_prompt: &str,
        user_input: &str,
        options: &RouteOptions,
    ) -> TextStream {
        let task = task_type.into();
        let policy = self.policy_for(&task);
        let Masked { masked, mapping } = vitae_pii::mask(user_input);
        let span = info_span!("route_stream", task = %task, request_id = %Uuid::new_v4());

        let run = StreamRun {
            request: StreamRequest {
                providers: Arc::clone(&self.providers),
                task,
                policy,
                system_prompt: system_prompt.to_string(),
                input: masked,
                options: options.clone(),
            },
            stats: Arc::clone(&self.stats),
            unmasker: StreamUnmasker::new(mapping),
            stage: Stage::Pending,
            active: None,
            usage: None,
            span,
        };

        stream::unfold(run, |mut run| {
            let span = run.span.clone();
            async move {
                let item = run.next_chunk().await?;
                Some((item, run))
            }
            .instrument(span)
        })
        .boxed()
    }
}

impl StreamRun {
    async fn next_chunk(&mut self) -> Option<Result<String>> {
        loop {
            if let Some(active) = self.active.as_mut() {
                match active.next().await {
                    Some(Ok(StreamChunk::Usage(usage))) => {
                        self.usage = Some(usage);
                        continue;
                    }
                    Some(Ok(StreamChunk::Text(chunk))) => {
                        let text = self.unmasker.push(&chunk);
                        if text.is_empty() {
                            continue;
                        }
                        return Some(Ok(text));
                    }
                    Some(Err(e)) => {
                        self.active = None;
                        if let Some(terminal) = self.on_stream_error(e) {
                            return Some(Err(terminal));
                        }
                        continue;
                    }
                    None => {
                        self.active = None;
                        self.complete();
                        let tail = self.unmasker.finish();
                        return (!tail.is_empty()).then_some(Ok(tail));
                    }
                }
            }

            match std::mem::replace(&mut self.stage, Stage::Finished) {
                Stage::Pending => {
                    self.stats.begin_request();
                    debug!(primary = %self.request.policy.primary, fallback = %self.request.policy.fallback, "Dispatching stream");
                    self.stage = Stage::OpenPrimary;
                }
                Stage::OpenPrimary => {
                    let target = self.request.policy.primary.clone();
                    match self.request.open(&target).await {
                        Ok(stream) => {
                            self.active = Some(stream);
                            self.stage = Stage::StreamingPrimary;
                        }
                        Err(Error::NotConfigured(_)) => {
                            info!(provider = %target.provider, "Primary provider unavailable, streaming from fallback");
                            self.stage = Stage::OpenFallback { primary_error: None };
                        }
                        Err(e) => {
                            warn!(provider = %target.provider, error = %e, "Primary stream failed to open, using fallback");
                            self.stage = Stage::OpenFallback {
                                primary_error: Some(e),
                            };
                        }
                    }
                }
                Stage::OpenFallback { primary_error } => {
                    let target = self.request.policy.fallback.clone();
                    match self.request.open(&target).await {
                        Ok(stream) => {
                            self.active = Some(stream);
                            self.stage = Stage::StreamingFallback;
                        }
                        Err(Error::NotConfigured(_)) => {
                            let error = no_provider_available(&self.request.task, primary_error.as_ref());
                            return Some(Err(self.fail(error)));
                        }
                        Err(e) => {
                            let error = Error::AllProvidersFailed {
                                task: self.request.task.to_string(),
                                source: Box::new(e),
                            };
                            return Some(Err(self.fail(error)));
                        }
                    }
                }
                Stage::StreamingPrimary | Stage::StreamingFallback | Stage::Finished => return None,
            }
        }
    }

    /// Decide what a mid-stream failure means; `Some` ends the stream
    fn on_stream_error(&mut self, error: Error) -> Option<Error> {
        match self.stage {
            Stage::StreamingPrimary => {
                warn!(provider = %self.request.policy.primary.provider, error = %error, "Primary stream broke, restarting on fallback");
                self.unmasker.reset();
                self.usage = None;
                self.stage = Stage::OpenFallback {
                    primary_error: Some(error),
                };
                None
            }
            _ => {
                let error = Error::AllProvidersFailed {
                    task: self.request.task.to_string(),
                    source: Box::new(error),
                };
                Some(self.fail(error))
            }
        }
    }

    fn complete(&mut self) {
        let target = match self.stage {
            Stage::StreamingFallback => &self.request.policy.fallback,
            _ => &self.request.policy.primary,
        };
        let provider = target.provider;
        let via_fallback = matches!(self.stage, Stage::StreamingFallback);
        let usage = self.usage.take().unwrap_or_default();

        // Backends that report no usage add no cost
        let cost = self
            .request
            .providers
            .get(provider)
            .filter(|_| usage.total_tokens > 0)
            .map_or(0.0, |adapter| {
                adapter
                    .calculate_cost(usage.input_tokens, usage.output_tokens, &target.model)
                    .total_cost
            });

        self.stage = Stage::Finished;
        self.stats.record_success(provider, &usage, cost, via_fallback);
        info!(%provider, via_fallback, tokens = usage.total_tokens, cost, "Stream completed");
    }

    fn fail(&mut self, error: Error) -> Error {
        self.stage = Stage::Finished;
        self.stats.record_failure();
        warn!(error = %error, "Stream failed");
        error
    }
}
