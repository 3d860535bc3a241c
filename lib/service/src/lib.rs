//! Assistant service for parley.
//!
//! Ties the pieces together into the operations a chat integration calls:
//! answering a question, regenerating or stopping an answer, summarizing a
//! thread or a channel's recent posts, reacting with an emoji, running text
//! helpers and collecting feedback.
//!
//! - [`Assistant`]: the request-level flows
//! - [`ServiceConfig`]: environment-driven configuration
//! - [`telemetry::init`]: tracing subscriber setup

pub mod assistant;
pub mod config;
pub mod error;
pub mod telemetry;

pub use assistant::{Assistant, FeedbackReport, Reply};
pub use config::{ServiceConfig, StreamingConfig};
pub use error::ServiceError;
