//! Errors from loading threads and calling tools.

use parley_core::{ErrorKind, PostId};
use parley_platform::StoreError;
use std::fmt;

/// Errors from thread resolution and snapshot operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadError {
    /// The thread root does not exist.
    NotFound { root_id: PostId },
    /// The snapshot has no posts.
    EmptyThread { root_id: PostId },
    /// The message store failed.
    Store(StoreError),
}

impl ThreadError {
    /// Returns the error kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::EmptyThread { .. } => ErrorKind::EmptyThread,
            Self::Store(e) => e.kind(),
        }
    }
}

impl fmt::Display for ThreadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { root_id } => write!(f, "thread not found: {root_id}"),
            Self::EmptyThread { root_id } => write!(f, "thread {root_id} has no posts"),
            Self::Store(e) => write!(f, "failed to load thread: {e}"),
        }
    }
}

impl std::error::Error for ThreadError {}

/// Errors from calling a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// No tool is registered under the name.
    NotFound { name: String },
    /// The tool ran and failed.
    ExecutionFailed { name: String, reason: String },
    /// The model's arguments do not fit the tool's schema.
    InvalidInput { name: String, reason: String },
}

impl ToolError {
    /// Returns the error kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::ExecutionFailed { .. } => ErrorKind::Storage,
            Self::InvalidInput { .. } => ErrorKind::BadRequest,
        }
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { name } => write!(f, "no tool named {name}"),
            Self::ExecutionFailed { name, reason } => write!(f, "tool {name} failed: {reason}"),
            Self::InvalidInput { name, reason } => {
                write!(f, "bad arguments for tool {name}: {reason}")
            }
        }
    }
}

impl std::error::Error for ToolError {}
