//! Chat service — the record → complete → record sequence shared by every
//! front-end channel.
//!
//! ```text
//! channel ──exchange(session, text)──▶ ChatService
//!                                        ├─ snapshot(session) + user turn
//!                                        ├─ Gateway::complete(transcript)
//!                                        └─ record_exchange(user, assistant)
//! ```
//!
//! Exchanges on the same session are serialised by a per-session async
//! lock held across the gateway call, so the transcript a request sends is
//! exactly the transcript its reply is appended to. Different sessions run
//! concurrently.
//!
//! The user turn is committed together with its reply. When the gateway
//! fails nothing is recorded, so a session never holds a user turn without
//! its answer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::conversation::{self, ConversationStore, Turn};
use crate::llm::{Gateway, ProviderError};

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("completion failed: {0}")]
    Completion(#[from] ProviderError),
}

impl ChatError {
    /// Whether the failure was the upstream call running past its timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ChatError::Completion(ProviderError::Timeout(_)))
    }
}

type SessionLock = Arc<tokio::sync::Mutex<()>>;

/// Shared capability handed to every channel as `Arc<ChatService>`.
pub struct ChatService {
    store: Arc<dyn ConversationStore>,
    gateway: Gateway,
    context_turns: Option<usize>,
    session_locks: Mutex<HashMap<String, SessionLock>>,
}

impl ChatService {
    pub fn new(store: Arc<dyn ConversationStore>, gateway: Gateway) -> Self {
        Self {
            store,
            gateway,
            context_turns: None,
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Cap the number of stored turns replayed upstream (see [`conversation::window`]).
    pub fn with_context_turns(mut self, context_turns: Option<usize>) -> Self {
        self.context_turns = context_turns;
        self
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Run one exchange on `session` and return the assistant's turn.
    pub async fn exchange(&self, session: &str, text: impl Into<String>) -> Result<Turn, ChatError> {
        let lock = self.session_lock(session);
        let _guard = lock.lock().await;

        let user = Turn::user(text);
        let mut transcript = self.store.snapshot(session);
        transcript.push(user.clone());
        let outbound = conversation::window(&transcript, self.context_turns);

        debug!(
            %session,
            stored_turns = transcript.len() - 1,
            sent_turns = outbound.len(),
            "exchange started"
        );

        match self.gateway.complete(outbound).await {
            Ok(reply) => {
                self.store.record_exchange(session, user, reply.clone());
                info!(%session, reply_len = reply.content.len(), "exchange completed");
                Ok(reply)
            }
            Err(e) => {
                warn!(%session, error = %e, "exchange failed — user turn discarded");
                Err(e.into())
            }
        }
    }

    /// Full stored transcript of `session`.
    pub fn transcript(&self, session: &str) -> Vec<Turn> {
        self.store.snapshot(session)
    }

    fn session_lock(&self, session: &str) -> SessionLock {
        let mut locks = self
            .session_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(session.to_string()).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{InMemoryStore, Role, DEFAULT_SESSION};
    use crate::llm::providers::dummy::DummyProvider;
    use crate::llm::providers::openai_compatible::OpenAiCompatibleProvider;
    use crate::llm::{LlmProvider, RetryPolicy};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::{Mock, MockServer, ResponseTemplate, matchers::method};

    fn dummy_service() -> ChatService {
        ChatService::new(
            Arc::new(InMemoryStore::new()),
            Gateway::new(LlmProvider::Dummy(DummyProvider), RetryPolicy::NONE),
        )
    }

    fn openai_service(server: &MockServer, retry: RetryPolicy) -> ChatService {
        let provider = OpenAiCompatibleProvider::new(
            format!("{}/v1/chat/completions", server.uri()),
            "gpt-3.5-turbo".into(),
            None,
            5,
            "sk-test".into(),
        )
        .unwrap();
        ChatService::new(
            Arc::new(InMemoryStore::new()),
            Gateway::new(LlmProvider::OpenAiCompatible(provider), retry),
        )
    }

    fn reply(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        }))
    }

    #[tokio::test]
    async fn n_exchanges_yield_2n_alternating_turns() {
        let svc = dummy_service();
        for i in 0..5 {
            let turn = svc.exchange(DEFAULT_SESSION, format!("message {i}")).await.unwrap();
            assert_eq!(turn.role, Role::Assistant);
        }

        let transcript = svc.transcript(DEFAULT_SESSION);
        assert_eq!(transcript.len(), 10);
        for (i, turn) in transcript.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(turn.role, expected, "turn {i}");
        }
        assert_eq!(transcript[8], Turn::user("message 4"));
        assert_eq!(transcript[9], Turn::assistant("[echo] message 4"));
    }

    #[tokio::test]
    async fn failure_leaves_store_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let svc = openai_service(&server, RetryPolicy::NONE);
        let err = svc.exchange(DEFAULT_SESSION, "Hello").await.unwrap_err();
        assert!(matches!(err, ChatError::Completion(ProviderError::Upstream { status: 500, .. })));
        assert!(!err.is_timeout());
        assert!(svc.transcript(DEFAULT_SESSION).is_empty());
    }

    #[tokio::test]
    async fn transient_failure_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(reply("third time lucky"))
            .expect(1)
            .mount(&server)
            .await;

        let retry = RetryPolicy { max_retries: 2, base_delay: Duration::from_millis(5) };
        let svc = openai_service(&server, retry);
        let turn = svc.exchange("s", "hi").await.unwrap();
        assert_eq!(turn.content, "third time lucky");
        assert_eq!(svc.transcript("s").len(), 2);
    }

    #[tokio::test]
    async fn retry_budget_is_bounded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .expect(2)
            .mount(&server)
            .await;

        let retry = RetryPolicy { max_retries: 1, base_delay: Duration::from_millis(5) };
        let err = openai_service(&server, retry).exchange("s", "hi").await.unwrap_err();
        assert!(matches!(err, ChatError::Completion(ProviderError::RateLimited(_))));
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .expect(1)
            .mount(&server)
            .await;

        let retry = RetryPolicy { max_retries: 3, base_delay: Duration::from_millis(5) };
        let err = openai_service(&server, retry).exchange("s", "hi").await.unwrap_err();
        assert!(matches!(err, ChatError::Completion(ProviderError::Unauthorized { .. })));
    }

    #[tokio::test]
    async fn context_window_limits_outbound_but_not_store() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(reply("ok")).mount(&server).await;

        let svc = openai_service(&server, RetryPolicy::NONE).with_context_turns(Some(3));
        for i in 0..3 {
            svc.exchange("s", format!("q{i}")).await.unwrap();
        }

        let requests = server.received_requests().await.unwrap();
        let last: serde_json::Value = serde_json::from_slice(&requests[2].body).unwrap();
        let messages = last["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["content"], "q1");
        assert_eq!(messages[2]["content"], "q2");
        assert_eq!(svc.transcript("s").len(), 6);
    }

    #[tokio::test]
    async fn concurrent_exchanges_keep_pairs_together() {
        let svc = Arc::new(dummy_service());
        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let svc = svc.clone();
                tokio::spawn(async move { svc.exchange(DEFAULT_SESSION, format!("m{i}")).await })
            })
            .collect();
        for t in tasks {
            t.await.unwrap().unwrap();
        }

        let transcript = svc.transcript(DEFAULT_SESSION);
        assert_eq!(transcript.len(), 32);
        for pair in transcript.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].content, format!("[echo] {}", pair[0].content));
        }
    }
}
