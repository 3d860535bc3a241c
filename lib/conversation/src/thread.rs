//! Thread translation and resolution.
//!
//! A thread is the root post plus every reply to it, in chronological
//! order. [`thread_to_conversation`] maps a thread onto conversation roles;
//! [`ThreadResolver`] loads a [`ThreadSnapshot`] that regeneration can cut
//! down to the post being answered.

use crate::conversation::Conversation;
use crate::error::ThreadError;
use crate::message::{ConversationMessage, Role};
use parley_core::{ChannelId, PostId, UserId};
use parley_platform::{MessageStore, Post, StoreError};
use std::sync::Arc;
use tracing::debug;

/// Returns the conversation role of a post written by `author_id`.
#[must_use]
pub fn role_for(bot_id: &UserId, author_id: &UserId) -> Role {
    if author_id == bot_id {
        Role::Assistant
    } else {
        Role::User
    }
}

/// Converts a thread into a conversation, one message per post.
///
/// Posts by the bot become assistant messages; everything else is a user
/// message. Order is preserved and nothing is filtered out.
#[must_use]
pub fn thread_to_conversation(bot_id: &UserId, posts: &[Post]) -> Conversation {
    let messages = posts
        .iter()
        .map(|post| ConversationMessage::new(role_for(bot_id, &post.user_id), post.message.clone()))
        .collect();
    Conversation::from_messages(messages)
}

/// The posts of a thread at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadSnapshot {
    root_id: PostId,
    posts: Vec<Post>,
}

impl ThreadSnapshot {
    /// Creates a snapshot from posts already in chronological order.
    #[must_use]
    pub fn new(root_id: PostId, posts: Vec<Post>) -> Self {
        Self { root_id, posts }
    }

    /// Returns the root post ID.
    #[must_use]
    pub fn root_id(&self) -> &PostId {
        &self.root_id
    }

    /// Returns the posts, root first.
    #[must_use]
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// Consumes the snapshot, returning its posts.
    #[must_use]
    pub fn into_posts(self) -> Vec<Post> {
        self.posts
    }

    /// Returns the number of posts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    /// Returns whether the snapshot has no posts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Returns the channel of the thread.
    #[must_use]
    pub fn channel_id(&self) -> Option<&ChannelId> {
        self.posts.first().map(|post| &post.channel_id)
    }

    /// Returns the distinct authors, in order of first appearance.
    #[must_use]
    pub fn participants(&self) -> Vec<&UserId> {
        let mut seen: Vec<&UserId> = Vec::new();
        for post in &self.posts {
            if !seen.contains(&&post.user_id) {
                seen.push(&post.user_id);
            }
        }
        seen
    }

    /// Returns true if the snapshot contains the post.
    #[must_use]
    pub fn contains(&self, post_id: &PostId) -> bool {
        self.position(post_id).is_some()
    }

    /// Drops every post after `post_id`, keeping `post_id` itself.
    ///
    /// Returns false and leaves the snapshot untouched when the post is not
    /// part of it; check [`latest`](Self::latest) before relying on the cut.
    pub fn truncate_at(&mut self, post_id: &PostId) -> bool {
        match self.position(post_id) {
            Some(index) => {
                self.posts.truncate(index + 1);
                true
            }
            None => false,
        }
    }

    /// Returns the last post.
    pub fn latest(&self) -> Result<&Post, ThreadError> {
        self.posts.last().ok_or_else(|| ThreadError::EmptyThread {
            root_id: self.root_id.clone(),
        })
    }

    /// Returns the post immediately before `post_id`.
    ///
    /// `None` if `post_id` is absent or is the first post.
    #[must_use]
    pub fn predecessor_of(&self, post_id: &PostId) -> Option<&Post> {
        let index = self.position(post_id)?;
        index.checked_sub(1).map(|prev| &self.posts[prev])
    }

    /// Translates the snapshot into a conversation.
    #[must_use]
    pub fn to_conversation(&self, bot_id: &UserId) -> Conversation {
        thread_to_conversation(bot_id, &self.posts)
    }

    fn position(&self, post_id: &PostId) -> Option<usize> {
        self.posts.iter().position(|post| &post.id == post_id)
    }
}

/// Loads thread snapshots from the message store.
pub struct ThreadResolver<S: ?Sized> {
    store: Arc<S>,
}

impl<S: MessageStore + ?Sized> ThreadResolver<S> {
    /// Creates a resolver over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Fetches the full thread rooted at `root_id`.
    pub async fn resolve(&self, root_id: &PostId) -> Result<ThreadSnapshot, ThreadError> {
        let posts = self
            .store
            .get_thread(root_id)
            .await
            .map_err(|e| match e {
                StoreError::ThreadNotFound { .. } | StoreError::PostNotFound { .. } => {
                    ThreadError::NotFound {
                        root_id: root_id.clone(),
                    }
                }
                other => ThreadError::Store(other),
            })?;

        debug!(root_id = %root_id, posts = posts.len(), "resolved thread");
        Ok(ThreadSnapshot::new(root_id.clone(), posts))
    }
}

impl<S: ?Sized> Clone for ThreadResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_platform::InMemoryPlatform;

    fn post(id: &str, author: &str, text: &str) -> Post {
        Post::new(UserId::new(author), ChannelId::new("c1"), text).with_id(id)
    }

    fn ids(snapshot: &ThreadSnapshot) -> Vec<&str> {
        snapshot.posts().iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn role_is_assistant_only_for_bot() {
        let bot = UserId::new("bot");
        assert_eq!(role_for(&bot, &UserId::new("bot")), Role::Assistant);
        assert_eq!(role_for(&bot, &UserId::new("alice")), Role::User);
    }

    #[test]
    fn translation_is_one_to_one_and_ordered() {
        let bot = UserId::new("bot");
        let posts = vec![
            post("p1", "alice", "q1"),
            post("p2", "bot", "a1"),
            post("p3", "bob", "q2"),
            post("p4", "bot", "a2"),
        ];

        let conversation = thread_to_conversation(&bot, &posts);

        assert_eq!(conversation.len(), posts.len());
        for (message, post) in conversation.messages.iter().zip(&posts) {
            assert_eq!(message.text(), post.message);
            assert_eq!(message.role(), role_for(&bot, &post.user_id));
        }
        assert_eq!(conversation.extract_system_text(), "");
    }

    #[test]
    fn translation_of_hi_hello() {
        let bot = UserId::new("bot");
        let posts = vec![post("p1", "alice", "hi"), post("p2", "bot", "hello")];

        let conversation = thread_to_conversation(&bot, &posts);

        assert_eq!(
            conversation.messages,
            vec![
                ConversationMessage::user("hi"),
                ConversationMessage::assistant("hello"),
            ]
        );
    }

    #[test]
    fn empty_thread_translates_to_empty_conversation() {
        let conversation = thread_to_conversation(&UserId::new("bot"), &[]);
        assert!(conversation.is_empty());
    }

    #[test]
    fn truncate_keeps_matching_post() {
        let mut snapshot = ThreadSnapshot::new(
            PostId::new("m1"),
            vec![post("m1", "alice", "1"), post("m2", "bot", "2"), post("m3", "alice", "3")],
        );

        assert!(snapshot.truncate_at(&PostId::new("m2")));
        assert_eq!(ids(&snapshot), vec!["m1", "m2"]);
        assert_eq!(snapshot.latest().expect("non-empty").id, PostId::new("m2"));
    }

    #[test]
    fn truncate_at_unknown_post_is_noop() {
        let mut snapshot = ThreadSnapshot::new(
            PostId::new("m1"),
            vec![post("m1", "alice", "1"), post("m2", "bot", "2")],
        );

        assert!(!snapshot.truncate_at(&PostId::new("missing")));
        assert_eq!(ids(&snapshot), vec!["m1", "m2"]);
    }

    #[test]
    fn latest_of_empty_snapshot_fails() {
        let snapshot = ThreadSnapshot::new(PostId::new("root"), Vec::new());
        let err = snapshot.latest().expect_err("empty");
        assert_eq!(
            err,
            ThreadError::EmptyThread {
                root_id: PostId::new("root")
            }
        );
    }

    #[test]
    fn predecessor_and_participants() {
        let snapshot = ThreadSnapshot::new(
            PostId::new("q1"),
            vec![
                post("q1", "alice", "q1"),
                post("a1", "bot", "a1"),
                post("q2", "alice", "q2"),
            ],
        );

        assert_eq!(
            snapshot.predecessor_of(&PostId::new("a1")).map(|p| p.id.as_str()),
            Some("q1")
        );
        assert!(snapshot.predecessor_of(&PostId::new("q1")).is_none());
        assert!(snapshot.predecessor_of(&PostId::new("zz")).is_none());

        let participants: Vec<&str> = snapshot.participants().iter().map(|u| u.as_str()).collect();
        assert_eq!(participants, vec!["alice", "bot"]);
        assert_eq!(snapshot.channel_id(), Some(&ChannelId::new("c1")));
    }

    #[tokio::test]
    async fn resolver_loads_thread() {
        let platform = Arc::new(InMemoryPlatform::new());
        platform.insert_post(post("q1", "alice", "q1")).await;
        platform
            .insert_post(post("a1", "bot", "a1").in_thread(PostId::new("q1")))
            .await;

        let resolver = ThreadResolver::new(platform);
        let snapshot = resolver.resolve(&PostId::new("q1")).await.expect("resolves");

        assert_eq!(ids(&snapshot), vec!["q1", "a1"]);
        assert_eq!(snapshot.root_id(), &PostId::new("q1"));
    }

    #[tokio::test]
    async fn resolver_reports_missing_root() {
        let resolver = ThreadResolver::new(Arc::new(InMemoryPlatform::new()));
        let err = resolver
            .resolve(&PostId::new("ghost"))
            .await
            .expect_err("no such root");
        assert_eq!(
            err,
            ThreadError::NotFound {
                root_id: PostId::new("ghost")
            }
        );
    }

    #[tokio::test]
    async fn regenerate_flow_checks_author() {
        let platform = Arc::new(InMemoryPlatform::new());
        platform.insert_post(post("q1", "alice", "q1")).await;
        platform
            .insert_post(post("a1", "bot", "a1").in_thread(PostId::new("q1")))
            .await;
        platform
            .insert_post(post("q2", "alice", "q2").in_thread(PostId::new("q1")))
            .await;

        let mut snapshot = ThreadResolver::new(platform)
            .resolve(&PostId::new("q1"))
            .await
            .expect("resolves");
        assert!(snapshot.truncate_at(&PostId::new("q2")));

        let latest = snapshot.latest().expect("non-empty");
        assert_eq!(latest.message, "q2");
        assert!(latest.is_authored_by(&UserId::new("alice")));
        assert!(!latest.is_authored_by(&UserId::new("mallory")));
    }
}
