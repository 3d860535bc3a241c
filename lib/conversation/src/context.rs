//! Context a conversation is rendered against.
//!
//! A context is built one of two ways: derived from the request (the user
//! asking, the channel, the post that triggered the request) or from named
//! prompt parameters alone, for actions that operate on free text. Fields
//! the chosen form does not use stay empty.

use parley_platform::{Channel, Post, User};
use std::collections::HashMap;

/// Metadata attached to a conversation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationContext {
    /// The user who triggered the request.
    pub requesting_user: Option<User>,
    /// The channel the request happened in.
    pub channel: Option<Channel>,
    /// The post the request is about.
    pub post: Option<Post>,
    /// Named parameters for prompt templates.
    pub prompt_parameters: HashMap<String, String>,
}

impl ConversationContext {
    /// Creates a context derived from the request.
    #[must_use]
    pub fn new(
        requesting_user: Option<User>,
        channel: Option<Channel>,
        post: Option<Post>,
    ) -> Self {
        Self {
            requesting_user,
            channel,
            post,
            prompt_parameters: HashMap::new(),
        }
    }

    /// Creates a context carrying only prompt parameters.
    #[must_use]
    pub fn parameters_only(prompt_parameters: HashMap<String, String>) -> Self {
        Self {
            prompt_parameters,
            ..Self::default()
        }
    }

    /// Adds a prompt parameter, replacing any previous value.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.prompt_parameters.insert(key.into(), value.into());
        self
    }

    /// Returns a prompt parameter, if set.
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.prompt_parameters.get(key).map(String::as_str)
    }

    /// Resolves a dotted placeholder path against the context.
    ///
    /// Supported paths are `requesting_user.{id,username,display_name}`,
    /// `channel.{id,name,display_name}`, `post.{id,message}` and
    /// `params.<key>`. Returns `None` when the path is unknown or the field
    /// it names is empty.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<String> {
        if let Some(key) = path.strip_prefix("params.") {
            return self.parameter(key).map(str::to_string);
        }

        let (scope, field) = path.split_once('.')?;
        match scope {
            "requesting_user" => {
                let user = self.requesting_user.as_ref()?;
                match field {
                    "id" => Some(user.id().to_string()),
                    "username" => Some(user.username().to_string()),
                    "display_name" => Some(user.preferred_name().to_string()),
                    _ => None,
                }
            }
            "channel" => {
                let channel = self.channel.as_ref()?;
                match field {
                    "id" => Some(channel.id.to_string()),
                    "name" => Some(channel.name.clone()),
                    "display_name" => Some(
                        channel
                            .display_name
                            .clone()
                            .unwrap_or_else(|| channel.name.clone()),
                    ),
                    _ => None,
                }
            }
            "post" => {
                let post = self.post.as_ref()?;
                match field {
                    "id" => Some(post.id.to_string()),
                    "message" => Some(post.message.clone()),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}
