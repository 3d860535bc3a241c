//! Streams engine output into a post.
//!
//! Each generation runs in its own task and outlives the request that
//! started it. The task rewrites the target post with the text accumulated
//! so far after every chunk. It stops applying chunks as soon as the session
//! is cancelled and always ends its session on the way out.

use crate::error::{StreamError, StreamFailure};
use crate::registry::StreamRegistry;
use futures::StreamExt;
use parley_ai::CompletionEngine;
use parley_conversation::Conversation;
use parley_core::{PostId, UserId};
use parley_platform::MessageStore;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

/// How a stream finished.
///
/// `text` is the body last written to the post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The engine finished and every chunk was written.
    Completed { text: String },
    /// The session was cancelled before the engine finished.
    Cancelled { text: String },
    /// The engine or the store failed.
    Failed { text: String, error: StreamFailure },
}

impl StreamOutcome {
    /// Returns the body last written to the post.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Completed { text } | Self::Cancelled { text } | Self::Failed { text, .. } => text,
        }
    }

    /// Returns true for [`StreamOutcome::Completed`].
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Handle to a running stream.
#[derive(Debug)]
pub struct StreamTask {
    post_id: PostId,
    handle: JoinHandle<StreamOutcome>,
}

impl StreamTask {
    /// Returns the post being written.
    #[must_use]
    pub fn post_id(&self) -> &PostId {
        &self.post_id
    }

    /// Returns true once the task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the stream to finish.
    ///
    /// A task that panicked or was aborted reports [`StreamFailure::Aborted`]
    /// with an empty text.
    pub async fn join(self) -> StreamOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => StreamOutcome::Failed {
                text: String::new(),
                error: StreamFailure::Aborted {
                    reason: e.to_string(),
                },
            },
        }
    }
}

/// Ends the session when dropped, whichever way the task exits.
#[derive(Debug)]
struct SessionGuard {
    registry: StreamRegistry,
    post_id: PostId,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.end(&self.post_id);
    }
}

/// A session held for a post whose stream has not started yet.
///
/// Holding the claim makes every other writer for the post fail with
/// `SessionAlreadyActive`, so the holder may prepare the post (for example,
/// clear its body) before streaming into it. Dropping an unstarted claim
/// ends the session.
#[derive(Debug)]
pub struct StreamClaim {
    cancel: CancellationToken,
    guard: SessionGuard,
}

impl StreamClaim {
    /// Returns the claimed post.
    #[must_use]
    pub fn post_id(&self) -> &PostId {
        &self.guard.post_id
    }

    /// Returns true if the session was cancelled while unstarted.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Spawns stream tasks that write into posts of a message store.
pub struct StreamWriter<S: ?Sized> {
    store: Arc<S>,
    registry: StreamRegistry,
}

impl<S: ?Sized> Clone for StreamWriter<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            registry: self.registry.clone(),
        }
    }
}

impl<S: MessageStore + ?Sized + 'static> StreamWriter<S> {
    /// Creates a writer over the given store and registry.
    pub fn new(store: Arc<S>, registry: StreamRegistry) -> Self {
        Self { store, registry }
    }

    /// Returns the registry sessions are kept in.
    #[must_use]
    pub fn registry(&self) -> &StreamRegistry {
        &self.registry
    }

    /// Registers a session for `post_id` without starting a stream.
    ///
    /// # Errors
    ///
    /// Returns `SessionAlreadyActive` if the post already has a session.
    pub fn claim(
        &self,
        post_id: PostId,
        requester_id: &UserId,
    ) -> Result<StreamClaim, StreamError> {
        let cancel = self.registry.begin(&post_id, requester_id)?;
        Ok(StreamClaim {
            cancel,
            guard: SessionGuard {
                registry: self.registry.clone(),
                post_id,
            },
        })
    }

    /// Spawns the task that streams `conversation` through `engine` into
    /// the claimed post.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        &self,
        claim: StreamClaim,
        engine: Arc<dyn CompletionEngine>,
        conversation: Conversation,
    ) -> StreamTask {
        let StreamClaim { cancel, guard } = claim;
        let post_id = guard.post_id.clone();
        let store = Arc::clone(&self.store);
        let span = info_span!("stream", post_id = %post_id, engine = engine.name());

        let target = post_id.clone();
        let handle = tokio::spawn(
            async move {
                let _guard = guard;
                let outcome =
                    run(store.as_ref(), engine.as_ref(), &conversation, &target, &cancel).await;
                match &outcome {
                    StreamOutcome::Completed { text } => {
                        info!(chars = text.len(), "stream completed");
                    }
                    StreamOutcome::Cancelled { text } => {
                        info!(chars = text.len(), "stream cancelled");
                    }
                    StreamOutcome::Failed { error, .. } if error.kind().is_client_error() => {
                        info!(error = %error, "stream rejected");
                    }
                    StreamOutcome::Failed { error, .. } => {
                        warn!(error = %error, "stream failed");
                    }
                }
                outcome
            }
            .instrument(span),
        );

        StreamTask { post_id, handle }
    }

    /// Claims `post_id` and starts streaming into it.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `SessionAlreadyActive` if the post already has a stream.
    pub fn spawn(
        &self,
        post_id: PostId,
        requester_id: &UserId,
        engine: Arc<dyn CompletionEngine>,
        conversation: Conversation,
    ) -> Result<StreamTask, StreamError> {
        let claim = self.claim(post_id, requester_id)?;
        Ok(self.start(claim, engine, conversation))
    }
}

async fn run<S: MessageStore + ?Sized>(
    store: &S,
    engine: &dyn CompletionEngine,
    conversation: &Conversation,
    post_id: &PostId,
    cancel: &CancellationToken,
) -> StreamOutcome {
    let mut text = String::new();

    let started = tokio::select! {
        biased;
        () = cancel.cancelled() => return StreamOutcome::Cancelled { text },
        started = engine.stream_complete(conversation, cancel.clone()) => started,
    };
    let mut stream = match started {
        Ok(stream) => stream,
        Err(e) => {
            return StreamOutcome::Failed {
                text,
                error: e.into(),
            };
        }
    };

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return StreamOutcome::Cancelled { text },
            next = stream.next() => next,
        };

        let chunk = match next {
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => {
                return StreamOutcome::Failed {
                    text,
                    error: e.into(),
                };
            }
            None => break,
        };

        // Late chunk: cancellation won the race while the chunk was in flight.
        if cancel.is_cancelled() {
            debug!("discarding chunk received after cancellation");
            return StreamOutcome::Cancelled { text };
        }

        let mut body = String::with_capacity(text.len() + chunk.len());
        body.push_str(&text);
        body.push_str(&chunk);
        if let Err(e) = store.update_post_body(post_id, &body).await {
            return StreamOutcome::Failed {
                text,
                error: e.into(),
            };
        }
        text = body;
    }

    if cancel.is_cancelled() {
        StreamOutcome::Cancelled { text }
    } else {
        StreamOutcome::Completed { text }
    }
}
