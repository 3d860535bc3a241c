//! Error types for the platform crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `StoreError`: failures reported by the message store or authorizer

use parley_core::{ChannelId, ErrorKind, PostId, UserId};
use std::fmt;

/// Errors from message store and authorizer operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Post not found.
    PostNotFound { id: PostId },
    /// A post with the same ID already exists.
    PostAlreadyExists { id: PostId },
    /// Thread root not found.
    ThreadNotFound { root_id: PostId },
    /// User not found.
    UserNotFound { id: UserId },
    /// Channel not found.
    ChannelNotFound { id: ChannelId },
    /// The store could not complete the operation.
    StorageFailed { reason: String },
}

impl StoreError {
    /// Returns the error kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PostNotFound { .. }
            | Self::ThreadNotFound { .. }
            | Self::UserNotFound { .. }
            | Self::ChannelNotFound { .. } => ErrorKind::NotFound,
            Self::PostAlreadyExists { .. } => ErrorKind::BadRequest,
            Self::StorageFailed { .. } => ErrorKind::Storage,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PostNotFound { id } => write!(f, "post not found: {id}"),
            Self::PostAlreadyExists { id } => write!(f, "post already exists: {id}"),
            Self::ThreadNotFound { root_id } => write!(f, "thread not found: {root_id}"),
            Self::UserNotFound { id } => write!(f, "user not found: {id}"),
            Self::ChannelNotFound { id } => write!(f, "channel not found: {id}"),
            Self::StorageFailed { reason } => write!(f, "message store failed: {reason}"),
        }
    }
}

impl std::error::Error for StoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_display() {
        let err = StoreError::PostNotFound {
            id: PostId::new("p1"),
        };
        assert!(err.to_string().contains("post not found"));
        assert!(err.to_string().contains("p1"));
    }

    #[test]
    fn store_error_kinds() {
        let missing = StoreError::ChannelNotFound {
            id: ChannelId::new("c1"),
        };
        assert_eq!(missing.kind(), ErrorKind::NotFound);

        let failed = StoreError::StorageFailed {
            reason: "connection reset".to_string(),
        };
        assert_eq!(failed.kind(), ErrorKind::Storage);
    }
}
