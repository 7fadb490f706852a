//! Reply fetcher: turns a submitted user message into one backend request and
//! exactly one `ReplyArrived` event, success or failure.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::events::AppEvent;
use crate::store::ConversationId;

/// Fixed user-facing text substituted for a reply when the fetch fails
pub const REPLY_ERROR_TEXT: &str =
    "Sorry, something went wrong while fetching a reply. Please try again.";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("backend returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("backend response did not contain an answer")]
    MalformedResponse,
}

/// Port to the answering backend. The HTTP implementation below is the real
/// one; tests substitute their own.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn ask(
        &self,
        query: &str,
        conversation_id: ConversationId,
    ) -> Result<String, BackendError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    query: &'a str,
    #[serde(rename = "conversationId")]
    conversation_id: u64,
}

#[derive(Deserialize)]
struct ChatResponse {
    answer: String,
}

/// Backend reached over HTTP: `POST {endpoint}/chat` with a JSON body
/// `{"query": ..., "conversationId": ...}`, answered by `{"answer": ...}`.
pub struct HttpBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpBackend {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn ask(
        &self,
        query: &str,
        conversation_id: ConversationId,
    ) -> Result<String, BackendError> {
        let url = format!("{}/chat", self.endpoint.trim_end_matches('/'));
        let payload = ChatRequest {
            query,
            conversation_id: conversation_id.0,
        };

        let response = self.client.post(&url).json(&payload).send().await?;

        if !response.status().is_success() {
            return Err(BackendError::Status(response.status()));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|_| BackendError::MalformedResponse)?;

        Ok(body.answer)
    }
}

/// Dispatches reply fetches without blocking the main loop.
///
/// Each dispatch spawns one task that carries the conversation id captured at
/// submission time as an immutable value; the completion path never re-reads
/// the currently active conversation.
pub struct ReplyFetcher {
    backend: Arc<dyn ChatBackend>,
    events: mpsc::UnboundedSender<AppEvent>,
}

impl ReplyFetcher {
    pub fn new(backend: Arc<dyn ChatBackend>, events: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self { backend, events }
    }

    /// Fire one fetch for the given text. Exactly one `ReplyArrived` event is
    /// sent no matter how the fetch ends, which is what lets the main loop
    /// clear the loading flag on every exit path.
    pub fn dispatch(&self, text: String, conversation_id: ConversationId) {
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();

        tokio::spawn(async move {
            let event = match backend.ask(&text, conversation_id).await {
                Ok(answer) => AppEvent::ReplyArrived {
                    conversation_id,
                    text: answer,
                    is_error: false,
                },
                Err(err) => {
                    tracing::warn!(error = %err, id = %conversation_id, "reply fetch failed");
                    AppEvent::ReplyArrived {
                        conversation_id,
                        text: REPLY_ERROR_TEXT.to_string(),
                        is_error: true,
                    }
                }
            };

            // Send failure means the main loop is gone; nothing left to do.
            let _ = events.send(event);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    struct CannedBackend {
        answer: &'static str,
    }

    #[async_trait]
    impl ChatBackend for CannedBackend {
        async fn ask(
            &self,
            _query: &str,
            _conversation_id: ConversationId,
        ) -> Result<String, BackendError> {
            Ok(self.answer.to_string())
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl ChatBackend for FailingBackend {
        async fn ask(
            &self,
            _query: &str,
            _conversation_id: ConversationId,
        ) -> Result<String, BackendError> {
            Err(BackendError::Status(
                reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }

    /// Drives the store the way the main loop does when a reply event arrives.
    fn apply_reply(store: &mut Store, event: AppEvent) {
        match event {
            AppEvent::ReplyArrived {
                conversation_id,
                text,
                is_error,
            } => {
                store.append_reply(conversation_id, text, is_error);
                store.finish_loading();
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn round_trip_produces_two_messages() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let fetcher = ReplyFetcher::new(Arc::new(CannedBackend { answer: "Hi there" }), tx);

        let mut store = Store::new();
        let id = store.submit_user_message("Hello");
        assert!(store.is_loading());

        fetcher.dispatch("Hello".to_string(), id);
        let event = rx.recv().await.unwrap();
        apply_reply(&mut store, event);

        let convo = store.active_conversation().unwrap();
        assert_eq!(convo.title, "Hello");
        assert_eq!(convo.messages.len(), 2);
        assert_eq!(convo.messages[0].text, "Hello");
        assert_eq!(convo.messages[1].text, "Hi there");
        assert!(!convo.messages[1].is_error);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn failed_fetch_yields_the_fixed_error_message() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let fetcher = ReplyFetcher::new(Arc::new(FailingBackend), tx);

        let mut store = Store::new();
        let id = store.submit_user_message("Hello");

        fetcher.dispatch("Hello".to_string(), id);
        let event = rx.recv().await.unwrap();
        apply_reply(&mut store, event);

        let convo = store.active_conversation().unwrap();
        assert_eq!(convo.messages.len(), 2);
        assert_eq!(convo.messages[1].text, REPLY_ERROR_TEXT);
        assert!(convo.messages[1].is_error);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn reply_lands_in_the_captured_conversation_after_a_switch() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let fetcher = ReplyFetcher::new(Arc::new(CannedBackend { answer: "late answer" }), tx);

        let mut store = Store::new();
        let captured = store.submit_user_message("first question");
        fetcher.dispatch("first question".to_string(), captured);

        // User switches away before the reply arrives.
        store.start_new_chat();
        store.submit_user_message("second question");

        let event = rx.recv().await.unwrap();
        apply_reply(&mut store, event);

        let original = store
            .conversations()
            .iter()
            .find(|c| c.id == captured)
            .unwrap();
        assert_eq!(original.messages.len(), 2);
        assert_eq!(original.messages[1].text, "late answer");
        assert_eq!(store.active_conversation().unwrap().messages.len(), 1);
    }

    #[tokio::test]
    async fn exactly_one_event_per_dispatch() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let fetcher = ReplyFetcher::new(Arc::new(FailingBackend), tx);

        fetcher.dispatch("hello".to_string(), ConversationId(1));
        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }
}
