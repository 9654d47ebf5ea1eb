//! Server-sent events decoding for streaming completions
//!
//! Every supported backend streams `text/event-stream` bodies. This module
//! turns a reqwest byte stream into `data:` payloads, and payloads into text
//! chunks through a per-backend parser.

use crate::completion::{ChunkStream, StreamChunk, TokenUsage};
use crate::error::{Error, Result};
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use std::collections::VecDeque;
use std::time::Duration;

/// Meaning of one `data:` payload for a given backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StreamSignal {
    /// Generated text
    Text(String),
    /// Generated text that also ends the generation
    Last(String),
    /// Completion marker without text
    Done,
    /// Bookkeeping event
    Skip,
}

/// Incremental `text/event-stream` decoder
///
/// Bytes are buffered until a full line is available, so multi-byte UTF-8
/// sequences split across network chunks decode correctly.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Feed bytes, returning the payloads of every event they complete
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            self.process_line(line.trim_end_matches(['\n', '\r']), &mut events);
        }
        events
    }

    /// Flush an event left open when the body ended
    pub fn finish(&mut self) -> Option<String> {
        if !self.buffer.is_empty() {
            let line = String::from_utf8_lossy(&self.buffer).into_owned();
            self.buffer.clear();
            let mut events = Vec::new();
            self.process_line(line.trim_end_matches('\r'), &mut events);
            if let Some(event) = events.pop() {
                return Some(event);
            }
        }
        self.take_event()
    }

    fn process_line(&mut self, line: &str, events: &mut Vec<String>) {
        if line.is_empty() {
            if let Some(event) = self.take_event() {
                events.push(event);
            }
            return;
        }
        // Field names other than `data` (event, id, retry) and `:` comments carry nothing we use
        if let Some(value) = line.strip_prefix("data:") {
            self.data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
    }

    fn take_event(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let event = self.data.join("\n");
        self.data.clear();
        Some(event)
    }
}

/// Decode a streaming response into its `data:` payloads.
///
/// Waiting longer than `idle_timeout` for the next network chunk yields
/// [`Error::Timeout`] and ends the stream.
pub(crate) fn data_stream(
    response: reqwest::Response,
    idle_timeout: Duration,
) -> BoxStream<'static, Result<String>> {
    let idle_ms = u64::try_from(idle_timeout.as_millis()).unwrap_or(u64::MAX);
    let state = (
        response.bytes_stream().boxed(),
        SseDecoder::default(),
        VecDeque::new(),
        false,
    );

    stream::unfold(state, move |(mut body, mut decoder, mut ready, mut done)| async move {
        loop {
            if let Some(event) = ready.pop_front() {
                return Some((Ok(event), (body, decoder, ready, done)));
            }
            if done {
                return None;
            }
            match tokio::time::timeout(idle_timeout, body.next()).await {
                Err(_) => {
                    done = true;
                    return Some((Err(Error::Timeout(idle_ms)), (body, decoder, ready, done)));
                }
                Ok(Some(Ok(chunk))) => ready.extend(decoder.push(&chunk)),
                Ok(Some(Err(e))) => {
                    done = true;
                    return Some((Err(Error::Network(e.to_string())), (body, decoder, ready, done)));
                }
                Ok(None) => {
                    done = true;
                    ready.extend(decoder.finish());
                }
            }
        }
    })
    .boxed()
}

/// Map payloads to chunks with backend-specific parsers.
///
/// `parse` decides what each payload means for the text. `read_usage`
/// picks up token counts wherever the backend reports them; reports are
/// merged and sent as one [`StreamChunk::Usage`] after the last text chunk.
///
/// The stream ends cleanly at [`StreamSignal::Done`] or
/// [`StreamSignal::Last`]. A body that closes before either yields
/// [`Error::InvalidResponse`]. Any error item is the last item.
pub(crate) fn chunk_stream(
    events: BoxStream<'static, Result<String>>,
    parse: fn(&str) -> Result<StreamSignal>,
    read_usage: fn(&str) -> Option<TokenUsage>,
) -> ChunkStream {
    let state = (events, false, None::<TokenUsage>);

    stream::unfold(state, move |(mut events, finished, mut usage)| async move {
        if finished {
            return usage.map(|usage| (Ok(StreamChunk::Usage(usage)), (events, true, None)));
        }
        loop {
            let item = match events.next().await {
                Some(Ok(data)) => {
                    if let Some(reported) = read_usage(&data) {
                        usage = Some(usage.map_or(reported, |seen| seen.merged(reported)));
                    }
                    parse(&data)
                }
                Some(Err(e)) => Err(e),
                None => Err(Error::InvalidResponse(
                    "stream closed before completion".to_string(),
                )),
            };
            match item {
                Ok(StreamSignal::Text(text)) if !text.is_empty() => {
                    return Some((Ok(StreamChunk::Text(text)), (events, false, usage)));
                }
                Ok(StreamSignal::Text(_) | StreamSignal::Skip) => continue,
                Ok(StreamSignal::Last(text)) if !text.is_empty() => {
                    return Some((Ok(StreamChunk::Text(text)), (events, true, usage)));
                }
                Ok(StreamSignal::Last(_) | StreamSignal::Done) => {
                    return usage.map(|usage| (Ok(StreamChunk::Usage(usage)), (events, true, None)));
                }
                Err(e) => return Some((Err(e), (events, true, None))),
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_splits_events() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b"data: one\n\ndata: two\n\n");
        assert_eq!(events, vec!["one", "two"]);
    }

    #[test]
    fn test_decoder_handles_partial_lines() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {\"a\":").is_empty());
        assert!(decoder.push(b" 1}\n").is_empty());
        assert_eq!(decoder.push(b"\n"), vec!["{\"a\": 1}"]);
    }

    #[test]
    fn test_decoder_ignores_event_and_comment_lines() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b": keep-alive\nevent: message_start\nid: 7\ndata: x\r\n\r\n");
        assert_eq!(events, vec!["x"]);
    }

    #[test]
    fn test_decoder_joins_multiline_data() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b"data: a\ndata: b\n\n");
        assert_eq!(events, vec!["a\nb"]);
    }

    #[test]
    fn test_decoder_keeps_split_utf8() {
        let mut decoder = SseDecoder::default();
        let bytes = "data: café\n\n".as_bytes();
        // split inside the two-byte 'é'
        let split = bytes.len() - 3;
        assert!(decoder.push(&bytes[..split]).is_empty());
        assert_eq!(decoder.push(&bytes[split..]), vec!["café"]);
    }

    #[test]
    fn test_decoder_finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: tail").is_empty());
        assert_eq!(decoder.finish(), Some("tail".to_string()));
        assert_eq!(decoder.finish(), None);
    }

    fn parse_plain(data: &str) -> Result<StreamSignal> {
        Ok(match data {
            "[DONE]" => StreamSignal::Done,
            "" => StreamSignal::Skip,
            other => StreamSignal::Text(other.to_string()),
        })
    }

    fn no_usage(_data: &str) -> Option<TokenUsage> {
        None
    }

    fn usage_line(data: &str) -> Option<TokenUsage> {
        let (input, output) = data.strip_prefix("usage ")?.split_once('/')?;
        Some(TokenUsage::new(input.parse().ok()?, output.parse().ok()?))
    }

    fn events(items: &[&str]) -> BoxStream<'static, Result<String>> {
        let items: Vec<Result<String>> = items.iter().map(|item| Ok(item.to_string())).collect();
        stream::iter(items).boxed()
    }

    #[tokio::test]
    async fn test_chunk_stream_stops_at_done() {
        let stream = chunk_stream(events(&["Hel", "", "lo", "[DONE]", "ignored"]), parse_plain, no_usage);

        let chunks: Vec<StreamChunk> = stream.map(|c| c.unwrap()).collect().await;
        assert_eq!(
            chunks,
            vec![
                StreamChunk::Text("Hel".to_string()),
                StreamChunk::Text("lo".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_chunk_stream_reports_truncation() {
        let chunks: Vec<_> = chunk_stream(events(&["partial"]), parse_plain, no_usage)
            .collect()
            .await;
        assert_eq!(chunks.len(), 2);
        assert!(matches!(chunks[1], Err(Error::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_chunk_stream_sends_merged_usage_last() {
        let stream = chunk_stream(
            events(&["usage 12/1", "Hi", "usage 0/7", "[DONE]"]),
            |data: &str| {
                Ok(if data.starts_with("usage ") {
                    StreamSignal::Skip
                } else {
                    parse_plain(data)?
                })
            },
            usage_line,
        );

        let chunks: Vec<StreamChunk> = stream.map(|c| c.unwrap()).collect().await;
        assert_eq!(
            chunks,
            vec![
                StreamChunk::Text("Hi".to_string()),
                StreamChunk::Usage(TokenUsage::new(12, 7)),
            ]
        );
    }

    #[tokio::test]
    async fn test_chunk_stream_drops_usage_on_error() {
        let chunks: Vec<_> = chunk_stream(events(&["usage 3/4", "cut"]), parse_plain, usage_line)
            .collect()
            .await;
        assert!(matches!(chunks.last(), Some(Err(Error::InvalidResponse(_)))));
        assert!(!chunks.iter().any(|c| matches!(c, Ok(StreamChunk::Usage(_)))));
    }
}
