//! Conversation model for parley.
//!
//! This crate provides:
//!
//! - **Conversation Model**: role-tagged messages plus the context a prompt
//!   is rendered against
//! - **Thread Translator**: turns a stored thread into a conversation by
//!   comparing each author with the bot identity
//! - **Thread State Resolver**: loads a thread snapshot that can be cut at a
//!   post for regeneration
//! - **Tool Registry**: capabilities a conversation may invoke

pub mod context;
pub mod conversation;
pub mod error;
pub mod message;
pub mod thread;
pub mod tool;

pub use context::ConversationContext;
pub use conversation::Conversation;
pub use error::{ThreadError, ToolError};
pub use message::{ConversationMessage, Role};
pub use thread::{ThreadResolver, ThreadSnapshot, role_for, thread_to_conversation};
pub use tool::{Tool, ToolDefinition, ToolRegistry};
