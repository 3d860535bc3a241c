//! Errors raised while talking to a completion engine.
//!
//! Each enum maps onto an [`ErrorKind`] so the service layer can wrap it in
//! a rootcause report without losing the category:
//! - `EngineError`: the engine refused or broke off
//! - `PromptError`: a template was missing or could not be rendered
//! - `FeedbackError`: thumbs up/down could not be stored or read

use parley_core::ErrorKind;
use std::fmt;

/// Errors from completion engine operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine cannot be reached.
    Unavailable { reason: String },
    /// Rate limit exceeded.
    RateLimited { retry_after_secs: Option<u64> },
    /// The engine rejected the conversation.
    InvalidRequest { reason: String },
}

impl EngineError {
    /// Returns the error kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unavailable { .. } => ErrorKind::EngineUnavailable,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::InvalidRequest { .. } => ErrorKind::InvalidRequest,
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { reason } => {
                write!(f, "completion engine unavailable: {reason}")
            }
            Self::RateLimited { retry_after_secs } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "rate limited, retry after {secs}s")
                } else {
                    write!(f, "rate limited")
                }
            }
            Self::InvalidRequest { reason } => {
                write!(f, "completion request rejected: {reason}")
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// Errors from prompt operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    /// Template not found.
    TemplateNotFound { name: String },
    /// A placeholder could not be resolved and has no default.
    MissingVariable { template: String, variable: String },
    /// Template parsing failed.
    ParseFailed { template: String, reason: String },
}

impl PromptError {
    /// Returns the error kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TemplateNotFound { .. } => ErrorKind::TemplateNotFound,
            Self::MissingVariable { .. } | Self::ParseFailed { .. } => ErrorKind::RenderError,
        }
    }

    /// Returns true if the template exists but could not be rendered.
    #[must_use]
    pub fn is_render_error(&self) -> bool {
        self.kind() == ErrorKind::RenderError
    }
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TemplateNotFound { name } => {
                write!(f, "prompt template not found: {name}")
            }
            Self::MissingVariable { template, variable } => {
                write!(
                    f,
                    "missing required variable '{variable}' in template '{template}'"
                )
            }
            Self::ParseFailed { template, reason } => {
                write!(f, "failed to parse prompt template '{template}': {reason}")
            }
        }
    }
}

impl std::error::Error for PromptError {}

/// Errors from feedback operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackError {
    /// Storage operation failed.
    StoreFailed { reason: String },
}

impl FeedbackError {
    /// Returns the error kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Storage
    }
}

impl fmt::Display for FeedbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StoreFailed { reason } => {
                write!(f, "failed to store feedback: {reason}")
            }
        }
    }
}

impl std::error::Error for FeedbackError {}
