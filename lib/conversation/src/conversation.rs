//! The conversation handed to a completion engine.

use crate::context::ConversationContext;
use crate::message::{ConversationMessage, Role};
use crate::tool::ToolRegistry;
use parley_platform::Post;

/// An ordered, role-tagged message sequence plus its context.
///
/// Message order is causal order. Combining conversations concatenates
/// their messages; nothing is ever reordered or deduplicated.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    /// Messages in causal order.
    pub messages: Vec<ConversationMessage>,
    /// Tools the model may invoke.
    pub tools: ToolRegistry,
    /// Context the conversation was built from.
    pub context: ConversationContext,
}

impl Conversation {
    /// Creates an empty conversation with the given context.
    #[must_use]
    pub fn new(context: ConversationContext) -> Self {
        Self {
            messages: Vec::new(),
            tools: ToolRegistry::new(),
            context,
        }
    }

    /// Creates a conversation from messages, with an empty context.
    #[must_use]
    pub fn from_messages(messages: Vec<ConversationMessage>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    /// Sets the available tools.
    #[must_use]
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    /// Appends a message.
    pub fn push(&mut self, message: ConversationMessage) {
        self.messages.push(message);
    }

    /// Appends a user message carrying the post's text.
    pub fn add_user_message(&mut self, post: &Post) {
        self.messages.push(ConversationMessage::user(post.message.clone()));
    }

    /// Appends every message of `other` after the existing ones.
    ///
    /// Only messages move; the receiver keeps its own tools and context.
    pub fn append_conversation(&mut self, other: Conversation) {
        self.messages.extend(other.messages);
    }

    /// Returns the concatenated text of all system messages, in order.
    #[must_use]
    pub fn extract_system_text(&self) -> String {
        self.messages
            .iter()
            .filter(|message| message.role() == Role::System)
            .map(ConversationMessage::text)
            .collect()
    }

    /// Returns the messages that are not system messages.
    pub fn dialogue(&self) -> impl Iterator<Item = &ConversationMessage> {
        self.messages
            .iter()
            .filter(|message| message.role() != Role::System)
    }

    /// Returns the number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns whether the conversation has no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the last message, if any.
    #[must_use]
    pub fn last_message(&self) -> Option<&ConversationMessage> {
        self.messages.last()
    }
}
