//! Error handling foundation for parley.
//!
//! This module provides the `Result` type alias using rootcause and the
//! [`ErrorKind`] taxonomy. Each crate defines its own domain-specific error
//! enum in its own error module and maps every variant onto a kind, so a
//! caller can tell a missing thread from a rate-limited engine no matter how
//! many layers the error crossed.

use rootcause::Report;
use std::fmt;

/// A Result type alias using rootcause's Report for error handling.
///
/// Each layer adds its own context as errors propagate.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

/// The kind of a failure, preserved across layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A referenced post, thread, user, channel or stream session is absent.
    NotFound,
    /// Identity mismatch on a privileged operation (cancel, regenerate, read).
    Forbidden,
    /// A second writer tried to stream into a post that already has one.
    SessionAlreadyActive,
    /// A thread snapshot has no posts.
    EmptyThread,
    /// Unknown prompt template name.
    TemplateNotFound,
    /// A prompt template could not be rendered against its context.
    RenderError,
    /// The completion engine is down or unreachable.
    EngineUnavailable,
    /// The completion engine refused the call because of rate limits.
    RateLimited,
    /// The completion engine rejected the conversation.
    InvalidRequest,
    /// The operation does not apply to the targeted post.
    BadRequest,
    /// An external store failed for a reason other than absence.
    Storage,
}

impl ErrorKind {
    /// Returns a stable snake_case name for the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::SessionAlreadyActive => "session_already_active",
            Self::EmptyThread => "empty_thread",
            Self::TemplateNotFound => "template_not_found",
            Self::RenderError => "render_error",
            Self::EngineUnavailable => "engine_unavailable",
            Self::RateLimited => "rate_limited",
            Self::InvalidRequest => "invalid_request",
            Self::BadRequest => "bad_request",
            Self::Storage => "storage",
        }
    }

    /// Returns true if the failure is caused by the caller rather than
    /// by a collaborator being unhealthy.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::EngineUnavailable | Self::RateLimited | Self::Storage
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
