//! Server-Sent Events (SSE) streaming support.
//!
//! The Messages API streams replies as SSE. `SseStream` is a pull-based
//! parser over the response byte stream; `ReplyStream` sits on top and
//! yields final-answer text fragments one at a time, accumulating the
//! reasoning trace and token usage on the side. The caller iterates until
//! exhaustion or simply drops the stream to abandon the reply.

use std::collections::VecDeque;

use futures_util::StreamExt;
use tokio::io::{AsyncBufReadExt, AsyncRead};
use tokio_util::io::StreamReader;

use banter_common::GatewayError;

use crate::{Reply, TokenUsage};

/// A single SSE event parsed from the stream.
#[derive(Debug, Clone)]
pub struct SseEvent {
    /// The event type (e.g., "message_start", "content_block_delta").
    pub event: Option<String>,
    /// The event data (JSON string).
    pub data: String,
}

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Pull-based SSE parser. Each `next_event` call suspends on network
/// I/O until one full event (or end of stream) is available.
pub struct SseStream {
    lines: tokio::io::Lines<tokio::io::BufReader<BoxedReader>>,
}

impl SseStream {
    pub fn from_response(response: reqwest::Response) -> Self {
        let byte_stream = response
            .bytes_stream()
            .map(|result| result.map_err(std::io::Error::other));
        Self::from_reader(StreamReader::new(byte_stream))
    }

    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        let boxed: BoxedReader = Box::new(reader);
        Self {
            lines: tokio::io::BufReader::new(boxed).lines(),
        }
    }

    /// Pull the next event, or `None` at end of stream.
    pub async fn next_event(&mut self) -> Result<Option<SseEvent>, GatewayError> {
        let mut current_event: Option<String> = None;
        let mut current_data = String::new();

        while let Some(line) = self
            .lines
            .next_line()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?
        {
            if line.is_empty() {
                // Empty line = end of event
                if !current_data.is_empty() {
                    return Ok(Some(SseEvent {
                        event: current_event,
                        data: current_data,
                    }));
                }
                current_event = None;
                continue;
            }

            if let Some(event_type) = line.strip_prefix("event: ") {
                current_event = Some(event_type.to_string());
            } else if let Some(data) = line.strip_prefix("data: ") {
                if !current_data.is_empty() {
                    current_data.push('\n');
                }
                current_data.push_str(data);
            }
            // Ignore other fields (id:, retry:, comments)
        }

        // Flush a final event that arrived without a trailing blank line
        if !current_data.is_empty() {
            return Ok(Some(SseEvent {
                event: current_event,
                data: current_data,
            }));
        }

        Ok(None)
    }
}

/// One semantic event within a streamed reply.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A final-answer text delta.
    Text(String),
    /// A reasoning-trace delta. Never surfaced as a fragment.
    Thinking(String),
    /// Token accounting (input from message_start, output from message_delta).
    Usage(TokenUsage),
}

enum FragmentSource {
    Sse(SseStream),
    Scripted(VecDeque<StreamEvent>),
}

/// Pull-based producer of reply text fragments.
///
/// The concatenation of every yielded fragment equals the final reply
/// text. `finish` is meaningful once `next_fragment` has returned `None`;
/// dropping the stream earlier abandons the reply and nothing survives.
pub struct ReplyStream {
    source: FragmentSource,
    text: String,
    thinking: String,
    usage: TokenUsage,
}

impl ReplyStream {
    pub(crate) fn from_sse(sse: SseStream) -> Self {
        Self::with_source(FragmentSource::Sse(sse))
    }

    /// Replay canned events instead of a live response. Lets callers
    /// exercise streaming consumers without a network.
    pub fn from_events(events: Vec<StreamEvent>) -> Self {
        Self::with_source(FragmentSource::Scripted(events.into()))
    }

    fn with_source(source: FragmentSource) -> Self {
        Self {
            source,
            text: String::new(),
            thinking: String::new(),
            usage: TokenUsage::default(),
        }
    }

    /// The next text fragment, or `None` when the reply is complete.
    pub async fn next_fragment(&mut self) -> Result<Option<String>, GatewayError> {
        loop {
            let event = match &mut self.source {
                FragmentSource::Sse(sse) => match sse.next_event().await? {
                    Some(event) => match parse_stream_event(&event)? {
                        Some(event) => event,
                        None => continue,
                    },
                    None => return Ok(None),
                },
                FragmentSource::Scripted(queue) => match queue.pop_front() {
                    Some(event) => event,
                    None => return Ok(None),
                },
            };

            match event {
                StreamEvent::Text(fragment) => {
                    self.text.push_str(&fragment);
                    return Ok(Some(fragment));
                }
                StreamEvent::Thinking(delta) => self.thinking.push_str(&delta),
                StreamEvent::Usage(usage) => {
                    if usage.input_tokens > 0 {
                        self.usage.input_tokens = usage.input_tokens;
                    }
                    if usage.output_tokens > 0 {
                        self.usage.output_tokens = usage.output_tokens;
                    }
                }
            }
        }
    }

    /// The accumulated reply. Call after `next_fragment` returns `None`.
    pub fn finish(self) -> Reply {
        let thinking = if self.thinking.is_empty() {
            None
        } else {
            Some(self.thinking)
        };
        Reply {
            text: self.text,
            thinking,
            usage: self.usage,
        }
    }
}

/// Map one Messages API SSE event onto a `StreamEvent`. Unknown events
/// and malformed delta payloads are skipped; an explicit `error` event
/// fails the stream.
fn parse_stream_event(event: &SseEvent) -> Result<Option<StreamEvent>, GatewayError> {
    let event_type = event.event.as_deref().unwrap_or("");
    match event_type {
        "content_block_delta" => {
            let Ok(data) = serde_json::from_str::<serde_json::Value>(&event.data) else {
                return Ok(None);
            };
            match data["delta"]["type"].as_str().unwrap_or("") {
                "text_delta" => Ok(data["delta"]["text"]
                    .as_str()
                    .map(|t| StreamEvent::Text(t.to_string()))),
                "thinking_delta" => Ok(data["delta"]["thinking"]
                    .as_str()
                    .map(|t| StreamEvent::Thinking(t.to_string()))),
                _ => Ok(None),
            }
        }
        "message_start" => {
            let Ok(data) = serde_json::from_str::<serde_json::Value>(&event.data) else {
                return Ok(None);
            };
            let input = data["message"]["usage"]["input_tokens"]
                .as_u64()
                .unwrap_or(0);
            Ok(Some(StreamEvent::Usage(TokenUsage {
                input_tokens: input,
                output_tokens: 0,
            })))
        }
        "message_delta" => {
            let Ok(data) = serde_json::from_str::<serde_json::Value>(&event.data) else {
                return Ok(None);
            };
            let output = data["usage"]["output_tokens"].as_u64().unwrap_or(0);
            Ok(Some(StreamEvent::Usage(TokenUsage {
                input_tokens: 0,
                output_tokens: output,
            })))
        }
        "error" => {
            let message = serde_json::from_str::<serde_json::Value>(&event.data)
                .ok()
                .and_then(|data| data["error"]["message"].as_str().map(String::from))
                .unwrap_or_else(|| event.data.clone());
            Err(GatewayError::Api(message))
        }
        _ => Ok(None),
    }
}
