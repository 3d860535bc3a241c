//! Post domain type.
//!
//! A post is a single message in a channel. Replies point at the root of
//! their thread through `root_id`; a root post has none.

use chrono::{DateTime, Utc};
use parley_core::{ChannelId, PostId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Property recording the user who asked for a bot post to be generated.
pub const REQUESTER_PROP: &str = "llm_requester_user_id";

/// Property marking a bot post as the target of a streaming generation.
pub const STREAM_TARGET_PROP: &str = "llm_stream_target";

/// A message stored by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Unique post identifier.
    pub id: PostId,
    /// Author of the post.
    pub user_id: UserId,
    /// Channel the post lives in.
    pub channel_id: ChannelId,
    /// Root of the thread, absent for a root post.
    pub root_id: Option<PostId>,
    /// Body text.
    pub message: String,
    /// Arbitrary key-value properties.
    #[serde(default)]
    pub props: HashMap<String, JsonValue>,
    /// When the post was created.
    pub create_at: DateTime<Utc>,
}

impl Post {
    /// Creates a new root post with a freshly generated ID.
    #[must_use]
    pub fn new(user_id: UserId, channel_id: ChannelId, message: impl Into<String>) -> Self {
        Self {
            id: PostId::generate(),
            user_id,
            channel_id,
            root_id: None,
            message: message.into(),
            props: HashMap::new(),
            create_at: Utc::now(),
        }
    }

    /// Overrides the generated ID.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<PostId>) -> Self {
        self.id = id.into();
        self
    }

    /// Overrides the creation time.
    #[must_use]
    pub fn with_create_at(mut self, create_at: DateTime<Utc>) -> Self {
        self.create_at = create_at;
        self
    }

    /// Makes this post a reply in the thread rooted at `root_id`.
    #[must_use]
    pub fn in_thread(mut self, root_id: PostId) -> Self {
        self.root_id = Some(root_id);
        self
    }

    /// Sets a property.
    #[must_use]
    pub fn with_prop(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.props.insert(key.into(), value);
        self
    }

    /// Returns a property value, if set.
    #[must_use]
    pub fn prop(&self, key: &str) -> Option<&JsonValue> {
        self.props.get(key)
    }

    /// Returns a property value if it is a string.
    #[must_use]
    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(JsonValue::as_str)
    }

    /// Returns the user recorded as the requester of this bot post.
    #[must_use]
    pub fn requester_id(&self) -> Option<UserId> {
        self.prop_str(REQUESTER_PROP).map(UserId::from)
    }

    /// Returns true if the post was created as a streaming target.
    #[must_use]
    pub fn is_stream_target(&self) -> bool {
        self.prop(STREAM_TARGET_PROP)
            .and_then(JsonValue::as_bool)
            .unwrap_or(false)
    }

    /// Returns the ID of the thread this post belongs to.
    #[must_use]
    pub fn thread_root_id(&self) -> PostId {
        self.root_id.clone().unwrap_or_else(|| self.id.clone())
    }

    /// Returns true if the post was written by `user_id`.
    #[must_use]
    pub fn is_authored_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }
}

/// An emoji reaction left on a post.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reaction {
    pub post_id: PostId,
    pub user_id: UserId,
    /// Emoji short name, without surrounding colons.
    pub emoji_name: String,
}

impl Reaction {
    #[must_use]
    pub fn new(post_id: PostId, user_id: UserId, emoji_name: impl Into<String>) -> Self {
        Self {
            post_id,
            user_id,
            emoji_name: emoji_name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_post_is_its_own_thread() {
        let post = Post::new(UserId::new("alice"), ChannelId::new("c1"), "hi").with_id("p1");
        assert_eq!(post.thread_root_id(), PostId::new("p1"));
    }

    #[test]
    fn reply_points_at_root() {
        let reply = Post::new(UserId::new("bot"), ChannelId::new("c1"), "hello")
            .in_thread(PostId::new("p1"));
        assert_eq!(reply.thread_root_id(), PostId::new("p1"));
    }

    #[test]
    fn requester_prop_round_trips() {
        let post = Post::new(UserId::new("bot"), ChannelId::new("c1"), "")
            .with_prop(REQUESTER_PROP, serde_json::json!("alice"))
            .with_prop(STREAM_TARGET_PROP, serde_json::json!(true));

        assert_eq!(post.requester_id(), Some(UserId::new("alice")));
        assert!(post.is_stream_target());
    }

    #[test]
    fn non_string_requester_is_ignored() {
        let post = Post::new(UserId::new("bot"), ChannelId::new("c1"), "")
            .with_prop(REQUESTER_PROP, serde_json::json!(42));
        assert_eq!(post.requester_id(), None);
        assert!(!post.is_stream_target());
    }
}
