//! Streaming client for the external completion service
//!
//! The relay opens one long-lived streaming request and republishes the
//! response chunks exactly as they arrive. Transport failures terminate the
//! stream with an explicit end reason instead of propagating an error: the
//! caller drains events, never catches a crash. Dropping the stream drops
//! the underlying response and closes the connection.

use async_stream::stream;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;

use crate::config::LlmConfig;

use super::{format_prompt, HUMAN_TURN_MARKER};

/// Why the relay stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Transport closed cleanly without a stop signal
    Completed,
    /// The service hit the stop sequence
    Stopped,
    /// Read failure or non-success status; logged, not surfaced as an error
    TransportError,
}

/// One event in the relay stream: tokens as received, then exactly one end
/// marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    Token(String),
    End(EndReason),
}

#[derive(Serialize)]
struct CompletionRequest {
    prompt: String,
    temperature: f32,
    top_k: u32,
    top_p: f32,
    n_keep: u32,
    n_predict: u32,
    cache_prompt: bool,
    slot_id: i32,
    stop: Vec<String>,
    stream: bool,
}

/// Client for the completion service
pub struct InferenceClient {
    client: Client,
    config: LlmConfig,
}

impl InferenceClient {
    /// Create a new client.
    ///
    /// The client carries no total-duration timeout: the service may
    /// legitimately stream for an unbounded time, and cutting the
    /// connection on a fixed deadline truncated long generations. Stalls
    /// are caught separately by the per-chunk idle timeout.
    pub fn new(config: &LlmConfig) -> Self {
        let client = Client::builder()
            .pool_max_idle_per_host(5)
            .build()
            .unwrap_or_default();

        Self {
            client,
            config: config.clone(),
        }
    }

    /// Open a streaming completion for `message` and relay its chunks.
    ///
    /// The returned stream is lazy, finite and non-restartable: tokens in
    /// arrival order, then one `RelayEvent::End`.
    pub fn completion_stream(&self, message: &str) -> impl Stream<Item = RelayEvent> + Send {
        let url = format!("{}/completion", self.config.base_url);
        let request = CompletionRequest {
            prompt: format_prompt(&self.config.instruction, message),
            temperature: self.config.temperature,
            top_k: self.config.top_k,
            top_p: self.config.top_p,
            // If the context window fills up, keep 0 prompt tokens
            n_keep: 0,
            n_predict: self.config.n_predict,
            cache_prompt: false,
            slot_id: -1,
            stop: vec![HUMAN_TURN_MARKER.to_string()],
            stream: true,
        };
        let client = self.client.clone();
        let idle_timeout_secs = self.config.idle_timeout_secs;

        stream! {
            let response = match client.post(&url).json(&request).send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!("Completion request failed for {}: {}", url, e);
                    yield RelayEvent::End(EndReason::TransportError);
                    return;
                }
            };

            if !response.status().is_success() {
                tracing::error!(
                    "Completion service returned HTTP {} for {}",
                    response.status(),
                    url
                );
                yield RelayEvent::End(EndReason::TransportError);
                return;
            }

            let idle = Duration::from_secs(idle_timeout_secs);
            let events = relay_events(response.bytes_stream(), url, idle);
            for await event in events {
                yield event;
            }
        }
    }
}

/// Translate a raw transport chunk stream into relay events.
///
/// Chunks pass through in order with no read-ahead; a read failure or an
/// idle stall is logged with the failed URL and ends the stream, it never
/// reaches the consumer as an error.
fn relay_events<S, B, E>(chunks: S, url: String, idle: Duration) -> impl Stream<Item = RelayEvent>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    stream! {
        futures_util::pin_mut!(chunks);
        let mut stopped = false;

        loop {
            let next = match timeout(idle, chunks.next()).await {
                Ok(Some(next)) => next,
                Ok(None) => break,
                Err(_) => {
                    tracing::error!("No bytes from {} for {:?}, giving up", url, idle);
                    yield RelayEvent::End(EndReason::TransportError);
                    return;
                }
            };

            match next {
                Ok(bytes) => {
                    let text = String::from_utf8_lossy(bytes.as_ref()).to_string();
                    if chunk_signals_stop(&text) {
                        stopped = true;
                    }
                    yield RelayEvent::Token(text);
                }
                Err(e) => {
                    tracing::error!("Stream read failed from {}: {}", url, e);
                    yield RelayEvent::End(EndReason::TransportError);
                    return;
                }
            }
        }

        let reason = if stopped { EndReason::Stopped } else { EndReason::Completed };
        yield RelayEvent::End(reason);
    }
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    stop: bool,
}

/// Whether any line of a streamed chunk carries the service's stop signal.
///
/// Chunks arrive as JSON lines, optionally with an SSE `data: ` prefix;
/// unparseable lines are ignored.
fn chunk_signals_stop(text: &str) -> bool {
    text.lines().any(|line| {
        let payload = line.strip_prefix("data: ").unwrap_or(line).trim();
        !payload.is_empty()
            && serde_json::from_str::<StreamChunk>(payload)
                .map(|chunk| chunk.stop)
                .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    async fn collect(
        chunks: Vec<std::result::Result<&'static str, &'static str>>,
    ) -> Vec<RelayEvent> {
        let source = stream::iter(chunks.into_iter().map(|r| r.map(str::as_bytes)));
        relay_events(
            source,
            "http://llm.test/completion".to_string(),
            Duration::from_secs(5),
        )
        .collect()
        .await
    }

    #[tokio::test]
    async fn test_clean_close_yields_chunks_then_completed() {
        let events = collect(vec![Ok("Hello"), Ok(" world")]).await;
        assert_eq!(
            events,
            vec![
                RelayEvent::Token("Hello".to_string()),
                RelayEvent::Token(" world".to_string()),
                RelayEvent::End(EndReason::Completed),
            ]
        );
    }

    #[tokio::test]
    async fn test_transport_error_terminates_stream_without_panic() {
        let events = collect(vec![Ok("Hello"), Err("connection reset")]).await;
        assert_eq!(
            events,
            vec![
                RelayEvent::Token("Hello".to_string()),
                RelayEvent::End(EndReason::TransportError),
            ]
        );
    }

    #[tokio::test]
    async fn test_immediate_error_yields_only_end_marker() {
        let events = collect(vec![Err("refused")]).await;
        assert_eq!(events, vec![RelayEvent::End(EndReason::TransportError)]);
    }

    #[tokio::test]
    async fn test_stop_signal_reported_as_stopped() {
        let events = collect(vec![
            Ok(r#"{"content":"Hi","stop":false}"#),
            Ok(r#"{"content":"","stop":true}"#),
        ])
        .await;
        assert_eq!(events.last(), Some(&RelayEvent::End(EndReason::Stopped)));
    }

    #[tokio::test]
    async fn test_stop_signal_with_whitespace_and_sse_framing() {
        let events = collect(vec![
            Ok("data: {\"content\":\"Hi\",\"stop\": false}\n\n"),
            Ok("data: {\"content\":\"\", \"stop\": true}\n\n"),
        ])
        .await;
        assert_eq!(events.last(), Some(&RelayEvent::End(EndReason::Stopped)));
    }

    #[test]
    fn test_non_json_chunk_is_not_a_stop() {
        assert!(!chunk_signals_stop("plain text, no framing"));
        assert!(!chunk_signals_stop(r#"{"content":"mentions \"stop\":true inside a string"}"#));
    }

    #[tokio::test]
    async fn test_empty_input_is_just_completed() {
        let events = collect(vec![]).await;
        assert_eq!(events, vec![RelayEvent::End(EndReason::Completed)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_stall_ends_with_transport_error() {
        let source = stream::iter(vec![Ok::<&[u8], &str>(b"Hello")])
            .chain(stream::pending());
        let events: Vec<RelayEvent> = relay_events(
            source,
            "http://llm.test/completion".to_string(),
            Duration::from_secs(30),
        )
        .collect()
        .await;

        assert_eq!(
            events,
            vec![
                RelayEvent::Token("Hello".to_string()),
                RelayEvent::End(EndReason::TransportError),
            ]
        );
    }
}
