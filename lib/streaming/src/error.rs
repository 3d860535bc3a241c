//! Error types for the streaming crate.
//!
//! - `StreamError`: registry operations (begin, cancel)
//! - `StreamFailure`: why a running stream stopped early

use parley_ai::EngineError;
use parley_core::{ErrorKind, PostId};
use parley_platform::StoreError;
use std::fmt;

/// Errors from stream registry operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// A stream is already writing into the post.
    SessionAlreadyActive { post_id: PostId },
    /// No stream is writing into the post.
    NotFound { post_id: PostId },
    /// The caller did not start the stream.
    Forbidden { post_id: PostId },
}

impl StreamError {
    /// Returns the error kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SessionAlreadyActive { .. } => ErrorKind::SessionAlreadyActive,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionAlreadyActive { post_id } => {
                write!(f, "a stream is already active for post {post_id}")
            }
            Self::NotFound { post_id } => write!(f, "no active stream for post {post_id}"),
            Self::Forbidden { post_id } => {
                write!(f, "stream for post {post_id} was started by another user")
            }
        }
    }
}

impl std::error::Error for StreamError {}

/// Why a stream stopped before completing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFailure {
    /// The completion engine failed to start or broke off.
    Engine(EngineError),
    /// Writing the post body failed.
    Store(StoreError),
    /// The writer task panicked or was aborted.
    Aborted { reason: String },
}

impl StreamFailure {
    /// Returns the error kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Engine(e) => e.kind(),
            Self::Store(e) => e.kind(),
            Self::Aborted { .. } => ErrorKind::Storage,
        }
    }
}

impl fmt::Display for StreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Engine(e) => write!(f, "engine failed: {e}"),
            Self::Store(e) => write!(f, "post update failed: {e}"),
            Self::Aborted { reason } => write!(f, "stream task aborted: {reason}"),
        }
    }
}

impl std::error::Error for StreamFailure {}

impl From<EngineError> for StreamFailure {
    fn from(e: EngineError) -> Self {
        Self::Engine(e)
    }
}

impl From<StoreError> for StreamFailure {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}
