//! Completion engine abstraction.
//!
//! The engine turns a [`Conversation`] into text, either in one piece or as
//! a stream of chunks. Vendor integrations live outside this workspace; they
//! implement [`CompletionEngine`] and are handed to the service as a trait
//! object.

use crate::error::EngineError;
use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use parley_conversation::Conversation;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// A stream of response chunks.
///
/// Lazy, finite and not restartable. Concatenating every chunk of a fully
/// drained stream yields the complete response.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, EngineError>> + Send>>;

/// Trait for completion engines.
#[async_trait]
pub trait CompletionEngine: Send + Sync {
    /// Generates the full response for a conversation.
    ///
    /// The default implementation drains [`stream_complete`](Self::stream_complete).
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails before or while producing text.
    async fn complete(&self, conversation: &Conversation) -> Result<String, EngineError> {
        let stream = self
            .stream_complete(conversation, CancellationToken::new())
            .await?;
        collect_text(stream).await
    }

    /// Starts streaming the response for a conversation.
    ///
    /// Once `cancel` fires the stream ends at the next chunk boundary
    /// without yielding a further fragment.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine refuses to start.
    async fn stream_complete(
        &self,
        conversation: &Conversation,
        cancel: CancellationToken,
    ) -> Result<TextStream, EngineError>;

    /// Returns a short name for logs.
    fn name(&self) -> &str;
}

/// Drains a stream, concatenating its chunks.
///
/// # Errors
///
/// Returns the first error the stream yields.
pub async fn collect_text(mut stream: TextStream) -> Result<String, EngineError> {
    let mut text = String::new();
    while let Some(chunk) = stream.next().await {
        text.push_str(&chunk?);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    struct Fixed(Vec<&'static str>);

    #[async_trait]
    impl CompletionEngine for Fixed {
        async fn stream_complete(
            &self,
            _conversation: &Conversation,
            _cancel: CancellationToken,
        ) -> Result<TextStream, EngineError> {
            let chunks: Vec<Result<String, EngineError>> =
                self.0.iter().map(|c| Ok((*c).to_string())).collect();
            Ok(Box::pin(stream::iter(chunks)))
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn default_complete_concatenates_stream() {
        let engine = Fixed(vec!["Hel", "lo", " world"]);
        let text = engine
            .complete(&Conversation::default())
            .await
            .expect("completes");
        assert_eq!(text, "Hello world");
    }

    #[tokio::test]
    async fn collect_stops_at_first_error() {
        let chunks: Vec<Result<String, EngineError>> = vec![
            Ok("partial".to_string()),
            Err(EngineError::Unavailable {
                reason: "dropped".to_string(),
            }),
            Ok("never".to_string()),
        ];
        let err = collect_text(Box::pin(stream::iter(chunks)))
            .await
            .expect_err("fails");
        assert!(matches!(err, EngineError::Unavailable { .. }));
    }
}
