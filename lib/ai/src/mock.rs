//! Scriptable completion engine for tests and local runs.
//!
//! # Example
//!
//! ```
//! use parley_ai::MockEngine;
//! use std::time::Duration;
//!
//! let engine = MockEngine::new()
//!     .with_response("Hello there")
//!     .with_chunk_delay(Duration::from_millis(5));
//! assert_eq!(engine.call_count(), 0);
//! ```

use crate::backend::{CompletionEngine, TextStream};
use crate::error::EngineError;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parley_conversation::Conversation;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Text returned once the scripted replies run out.
pub const DEFAULT_RESPONSE: &str = "Mock response";

/// A scripted reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Stream these chunks, then finish.
    Chunks(Vec<String>),
    /// Refuse to start.
    Error(EngineError),
    /// Stream these chunks, then yield the error.
    FailAfter {
        chunks: Vec<String>,
        error: EngineError,
    },
}

impl MockReply {
    /// Splits text into word chunks that concatenate back to the text.
    #[must_use]
    pub fn words(text: &str) -> Self {
        Self::Chunks(text.split_inclusive(' ').map(str::to_string).collect())
    }
}

/// Mock completion engine.
///
/// Replies are consumed in order. Every conversation the engine receives is
/// recorded for later inspection.
#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    calls: Arc<Mutex<Vec<Conversation>>>,
    chunk_delay: Duration,
}

impl MockEngine {
    /// Creates an engine with no scripted replies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply streamed word by word.
    #[must_use]
    pub fn with_response(self, text: &str) -> Self {
        self.with_reply(MockReply::words(text))
    }

    /// Queues a reply streamed as the given chunks.
    #[must_use]
    pub fn with_chunks<I, S>(self, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_reply(MockReply::Chunks(chunks.into_iter().map(Into::into).collect()))
    }

    /// Queues an error returned before any chunk.
    #[must_use]
    pub fn with_error(self, error: EngineError) -> Self {
        self.with_reply(MockReply::Error(error))
    }

    /// Queues an arbitrary reply.
    #[must_use]
    pub fn with_reply(self, reply: MockReply) -> Self {
        lock(&self.replies).push_back(reply);
        self
    }

    /// Sets the delay before each chunk.
    #[must_use]
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Returns the number of calls made to this engine.
    #[must_use]
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Returns every conversation received, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<Conversation> {
        lock(&self.calls).clone()
    }

    fn next_reply(&self, conversation: &Conversation) -> MockReply {
        lock(&self.calls).push(conversation.clone());
        lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| MockReply::words(DEFAULT_RESPONSE))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl CompletionEngine for MockEngine {
    async fn complete(&self, conversation: &Conversation) -> Result<String, EngineError> {
        match self.next_reply(conversation) {
            MockReply::Chunks(chunks) => Ok(chunks.concat()),
            MockReply::Error(error) | MockReply::FailAfter { error, .. } => Err(error),
        }
    }

    async fn stream_complete(
        &self,
        conversation: &Conversation,
        cancel: CancellationToken,
    ) -> Result<TextStream, EngineError> {
        let (chunks, trailing_error) = match self.next_reply(conversation) {
            MockReply::Chunks(chunks) => (chunks, None),
            MockReply::Error(error) => return Err(error),
            MockReply::FailAfter { chunks, error } => (chunks, Some(error)),
        };

        let delay = self.chunk_delay;
        let items = chunks
            .into_iter()
            .map(Ok)
            .chain(trailing_error.map(Err));
        let stream = stream::iter(items)
            .then(move |item| async move {
                if !delay.is_zero() {
                    sleep(delay).await;
                }
                item
            })
            .take_until(cancel.cancelled_owned());

        Ok(Box::pin(stream))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::collect_text;
    use parley_conversation::ConversationMessage;

    fn question() -> Conversation {
        Conversation::from_messages(vec![ConversationMessage::user("hi")])
    }

    #[tokio::test]
    async fn replies_in_order_then_default() {
        let engine = MockEngine::new().with_response("First").with_response("Second");

        assert_eq!(engine.complete(&question()).await.expect("ok"), "First");
        assert_eq!(engine.complete(&question()).await.expect("ok"), "Second");
        assert_eq!(engine.complete(&question()).await.expect("ok"), DEFAULT_RESPONSE);
        assert_eq!(engine.call_count(), 3);
    }

    #[tokio::test]
    async fn drained_stream_equals_complete_text() {
        let engine = MockEngine::new().with_response("the quick brown fox");
        let stream = engine
            .stream_complete(&question(), CancellationToken::new())
            .await
            .expect("starts");
        assert_eq!(collect_text(stream).await.expect("drains"), "the quick brown fox");
    }

    #[tokio::test]
    async fn records_received_conversations() {
        let engine = MockEngine::new();
        engine.complete(&question()).await.expect("ok");
        let calls = engine.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].messages, question().messages);
    }

    #[tokio::test]
    async fn error_before_stream() {
        let engine = MockEngine::new().with_error(EngineError::RateLimited {
            retry_after_secs: Some(5),
        });
        let result = engine
            .stream_complete(&question(), CancellationToken::new())
            .await;
        assert!(matches!(result, Err(EngineError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn error_after_chunks() {
        let engine = MockEngine::new().with_reply(MockReply::FailAfter {
            chunks: vec!["par".to_string(), "tial".to_string()],
            error: EngineError::Unavailable {
                reason: "reset".to_string(),
            },
        });
        let mut stream = engine
            .stream_complete(&question(), CancellationToken::new())
            .await
            .expect("starts");

        assert_eq!(stream.next().await, Some(Ok("par".to_string())));
        assert_eq!(stream.next().await, Some(Ok("tial".to_string())));
        assert!(matches!(stream.next().await, Some(Err(EngineError::Unavailable { .. }))));
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn cancellation_ends_stream_at_chunk_boundary() {
        let engine = MockEngine::new().with_chunks(["a", "b", "c"]);
        let cancel = CancellationToken::new();
        let mut stream = engine
            .stream_complete(&question(), cancel.clone())
            .await
            .expect("starts");

        assert_eq!(stream.next().await, Some(Ok("a".to_string())));
        cancel.cancel();
        assert_eq!(stream.next().await, None);
    }
}
