//! AI primitives for parley.
//!
//! This crate provides:
//!
//! - **Prompt Builder**: named templates rendered against a conversation
//!   context
//! - **Completion Engine**: the port a language model sits behind, with a
//!   streaming variant that honours cancellation
//! - **Feedback**: thumbs up/down records on bot answers
//!
//! A scriptable [`MockEngine`] stands in for a real model in tests.

pub mod backend;
pub mod error;
pub mod feedback;
pub mod mock;
pub mod prompt;

pub use backend::{CompletionEngine, TextStream, collect_text};
pub use error::{EngineError, FeedbackError, PromptError};
pub use feedback::{Feedback, FeedbackSignal, FeedbackStats, FeedbackStore, InMemoryFeedbackStore};
pub use mock::{MockEngine, MockReply};
pub use prompt::{PromptRegistry, PromptTemplate, VariableDefinition};
