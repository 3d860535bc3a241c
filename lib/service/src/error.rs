//! Error types for the service crate.
//!
//! `ServiceError` is the context of every report the assistant returns.
//! Lower-level errors are wrapped as they are, so their kind survives.

use parley_ai::{EngineError, FeedbackError, PromptError};
use parley_conversation::ThreadError;
use parley_core::{ChannelId, ErrorKind, PostId, UserId};
use parley_platform::StoreError;
use parley_streaming::StreamError;
use std::fmt;

/// Errors from assistant operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The user may not act on the post.
    Forbidden { user_id: UserId, post_id: PostId },
    /// The operation does not apply to the post.
    BadRequest { post_id: PostId, reason: String },
    /// The post is not part of the thread it claims to belong to.
    PostNotInThread { post_id: PostId, root_id: PostId },
    /// The user may not read the channel.
    ChannelForbidden { user_id: UserId, channel_id: ChannelId },
    /// Nothing was posted in the channel during the requested window.
    NothingToSummarize { channel_id: ChannelId },
    /// The engine's answer is not an emoji name.
    NotAnEmoji { answer: String },
    /// Message store failure.
    Store(StoreError),
    /// Thread resolution failure.
    Thread(ThreadError),
    /// Prompt rendering failure.
    Prompt(PromptError),
    /// Completion engine failure.
    Engine(EngineError),
    /// Stream registry failure.
    Stream(StreamError),
    /// Feedback store failure.
    Feedback(FeedbackError),
}

impl ServiceError {
    /// Returns the error kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::BadRequest { .. } => ErrorKind::BadRequest,
            Self::PostNotInThread { .. } => ErrorKind::NotFound,
            Self::ChannelForbidden { .. } => ErrorKind::Forbidden,
            Self::NothingToSummarize { .. } => ErrorKind::BadRequest,
            Self::NotAnEmoji { .. } => ErrorKind::InvalidRequest,
            Self::Store(e) => e.kind(),
            Self::Thread(e) => e.kind(),
            Self::Prompt(e) => e.kind(),
            Self::Engine(e) => e.kind(),
            Self::Stream(e) => e.kind(),
            Self::Feedback(e) => e.kind(),
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forbidden { user_id, post_id } => {
                write!(f, "user {user_id} may not act on post {post_id}")
            }
            Self::BadRequest { post_id, reason } => {
                write!(f, "cannot act on post {post_id}: {reason}")
            }
            Self::PostNotInThread { post_id, root_id } => {
                write!(f, "post {post_id} is not part of thread {root_id}")
            }
            Self::ChannelForbidden {
                user_id,
                channel_id,
            } => write!(f, "user {user_id} may not read channel {channel_id}"),
            Self::NothingToSummarize { channel_id } => {
                write!(f, "no posts to summarize in channel {channel_id}")
            }
            Self::NotAnEmoji { answer } => write!(f, "engine answered {answer:?}, not an emoji"),
            Self::Store(e) => write!(f, "{e}"),
            Self::Thread(e) => write!(f, "{e}"),
            Self::Prompt(e) => write!(f, "{e}"),
            Self::Engine(e) => write!(f, "{e}"),
            Self::Stream(e) => write!(f, "{e}"),
            Self::Feedback(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<ThreadError> for ServiceError {
    fn from(e: ThreadError) -> Self {
        Self::Thread(e)
    }
}

impl From<PromptError> for ServiceError {
    fn from(e: PromptError) -> Self {
        Self::Prompt(e)
    }
}

impl From<EngineError> for ServiceError {
    fn from(e: EngineError) -> Self {
        Self::Engine(e)
    }
}

impl From<StreamError> for ServiceError {
    fn from(e: StreamError) -> Self {
        Self::Stream(e)
    }
}

impl From<FeedbackError> for ServiceError {
    fn from(e: FeedbackError) -> Self {
        Self::Feedback(e)
    }
}
