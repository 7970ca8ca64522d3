//! Conversational inference endpoint
//!
//! The handler appends the user turn, optionally augments the message with
//! retrieval context, then streams the relay's chunks through as the
//! response body. A spawned task owns the relay stream and forwards tokens
//! to the response over a channel, so the assistant turn is recorded when
//! the relay ends even if the client disconnected mid-stream; a dropped
//! connection keeps the partial reply in the session.

use async_stream::stream;
use axum::{
    body::Body,
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use futures_util::{pin_mut, Stream, StreamExt};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::relay::RelayEvent;
use crate::retrieval::{augment_with_context, search_context};
use crate::server::state::AppState;
use crate::session::{Role, SessionRegistry};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
    /// Collection to search for context; defaults to the configured one
    pub collection: Option<String>,
    #[serde(default)]
    pub use_context: bool,
}

/// POST /chat
pub async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> impl IntoResponse {
    state
        .sessions()
        .append(&request.session_id, Role::User, &request.message);

    let message = if request.use_context {
        let collection = request
            .collection
            .unwrap_or_else(|| state.config().index.default_collection.clone());
        match search_context(
            state.embedder(),
            state.index(),
            &collection,
            &request.message,
            state.config().retrieval.top_k,
        )
        .await
        {
            Ok(context) => augment_with_context(&request.message, &context),
            Err(e) => {
                // A failed lookup degrades to a context-free answer
                tracing::warn!("Context retrieval failed for {}: {}", collection, e);
                request.message.clone()
            }
        }
    } else {
        request.message.clone()
    };

    let events = state.inference().completion_stream(&message);
    let (mut tokens, _drain) = spawn_relay_drain(
        Arc::clone(state.sessions()),
        request.session_id,
        events,
    );

    let body = stream! {
        while let Some(text) = tokens.recv().await {
            yield Ok::<String, Infallible>(text);
        }
    };

    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(body),
    )
}

/// Drain the relay in a detached task, forwarding tokens to the returned
/// channel. The task outlives the response body: when the receiver is
/// dropped the remaining tokens are still consumed and the assistant turn
/// is appended on the end marker, so the session keeps whatever was
/// generated.
fn spawn_relay_drain(
    sessions: Arc<SessionRegistry>,
    session_id: String,
    events: impl Stream<Item = RelayEvent> + Send + 'static,
) -> (mpsc::Receiver<String>, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(32);

    let handle = tokio::spawn(async move {
        pin_mut!(events);
        let mut assistant = String::new();
        let mut client_gone = false;

        while let Some(event) = events.next().await {
            match event {
                RelayEvent::Token(text) => {
                    assistant.push_str(&text);
                    if !client_gone && tx.send(text).await.is_err() {
                        tracing::debug!("Client for session {} went away, draining", session_id);
                        client_gone = true;
                    }
                }
                RelayEvent::End(reason) => {
                    tracing::debug!("Relay for session {} ended: {:?}", session_id, reason);
                    if !assistant.is_empty() {
                        sessions.append(&session_id, Role::Assistant, &assistant);
                    }
                }
            }
        }
    });

    (rx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::relay::EndReason;
    use futures::stream;

    fn registry() -> Arc<SessionRegistry> {
        Arc::new(SessionRegistry::new(&SessionConfig::default()))
    }

    #[tokio::test]
    async fn test_tokens_forwarded_and_assistant_turn_recorded() {
        let sessions = registry();
        let events = stream::iter(vec![
            RelayEvent::Token("Hello".to_string()),
            RelayEvent::Token(" world".to_string()),
            RelayEvent::End(EndReason::Completed),
        ]);

        let (mut rx, handle) = spawn_relay_drain(sessions.clone(), "s1".to_string(), events);
        let mut forwarded = Vec::new();
        while let Some(text) = rx.recv().await {
            forwarded.push(text);
        }
        handle.await.unwrap();

        assert_eq!(forwarded, vec!["Hello", " world"]);
        let history = sessions.history("s1");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::Assistant);
        assert_eq!(history[0].message, "Hello world");
    }

    #[tokio::test]
    async fn test_partial_reply_kept_when_receiver_dropped() {
        let sessions = registry();
        let events = stream::iter(vec![
            RelayEvent::Token("par".to_string()),
            RelayEvent::Token("tial".to_string()),
            RelayEvent::End(EndReason::TransportError),
        ]);

        let (rx, handle) = spawn_relay_drain(sessions.clone(), "s1".to_string(), events);
        drop(rx);
        handle.await.unwrap();

        let history = sessions.history("s1");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].message, "partial");
    }

    #[tokio::test]
    async fn test_empty_generation_records_no_assistant_turn() {
        let sessions = registry();
        let events = stream::iter(vec![RelayEvent::End(EndReason::TransportError)]);

        let (rx, handle) = spawn_relay_drain(sessions.clone(), "s1".to_string(), events);
        drop(rx);
        handle.await.unwrap();

        assert!(sessions.history("s1").is_empty());
    }
}
