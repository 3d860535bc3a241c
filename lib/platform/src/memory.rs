//! In-memory platform.
//!
//! Implements both [`MessageStore`] and [`Authorizer`] over process-local
//! maps. Thread order is insertion order, which matches the chronological
//! order a real store returns. Every body update is kept so tests can check
//! the exact sequence of edits a streaming reply produced.

use crate::channel::Channel;
use crate::error::StoreError;
use crate::post::{Post, Reaction};
use crate::store::{Authorizer, MessageStore};
use crate::user::User;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parley_core::{ChannelId, PostId, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
struct State {
    posts: HashMap<PostId, Post>,
    /// Post IDs in insertion order.
    order: Vec<PostId>,
    users: HashMap<UserId, User>,
    channels: HashMap<ChannelId, Channel>,
    members: HashMap<ChannelId, HashSet<UserId>>,
    body_history: HashMap<PostId, Vec<String>>,
    reactions: HashMap<PostId, Vec<Reaction>>,
}

/// A process-local chat platform.
///
/// Clone is cheap (Arc-based); clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPlatform {
    state: Arc<RwLock<State>>,
    fail_updates: Arc<AtomicBool>,
}

impl InMemoryPlatform {
    /// Creates an empty platform.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user.
    pub async fn add_user(&self, user: User) {
        let mut state = self.state.write().await;
        state.users.insert(user.id().clone(), user);
    }

    /// Adds or replaces a channel.
    pub async fn add_channel(&self, channel: Channel) {
        let mut state = self.state.write().await;
        state.channels.insert(channel.id.clone(), channel);
    }

    /// Grants a user read access to a channel.
    pub async fn add_member(&self, channel_id: &ChannelId, user_id: &UserId) {
        let mut state = self.state.write().await;
        state
            .members
            .entry(channel_id.clone())
            .or_default()
            .insert(user_id.clone());
    }

    /// Stores a post as-is, keeping its ID.
    pub async fn insert_post(&self, post: Post) {
        let mut state = self.state.write().await;
        if !state.posts.contains_key(&post.id) {
            state.order.push(post.id.clone());
        }
        state.posts.insert(post.id.clone(), post);
    }

    /// Returns every body a post has been given through `update_post_body`.
    pub async fn body_history(&self, id: &PostId) -> Vec<String> {
        let state = self.state.read().await;
        state.body_history.get(id).cloned().unwrap_or_default()
    }

    /// Returns the reactions on a post in the order they were added.
    pub async fn reactions(&self, id: &PostId) -> Vec<Reaction> {
        let state = self.state.read().await;
        state.reactions.get(id).cloned().unwrap_or_default()
    }

    /// Makes subsequent `update_post_body` calls fail.
    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageStore for InMemoryPlatform {
    async fn get_post(&self, id: &PostId) -> Result<Post, StoreError> {
        let state = self.state.read().await;
        state
            .posts
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::PostNotFound { id: id.clone() })
    }

    async fn get_thread(&self, root_id: &PostId) -> Result<Vec<Post>, StoreError> {
        let state = self.state.read().await;
        if !state.posts.get(root_id).is_some_and(|root| root.root_id.is_none()) {
            return Err(StoreError::ThreadNotFound {
                root_id: root_id.clone(),
            });
        }

        let thread: Vec<Post> = state
            .order
            .iter()
            .filter_map(|id| state.posts.get(id))
            .filter(|post| &post.id == root_id || post.root_id.as_ref() == Some(root_id))
            .cloned()
            .collect();

        debug!(root_id = %root_id, posts = thread.len(), "loaded thread");
        Ok(thread)
    }

    async fn get_posts_since(
        &self,
        channel_id: &ChannelId,
        since: DateTime<Utc>,
    ) -> Result<Vec<Post>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .order
            .iter()
            .filter_map(|id| state.posts.get(id))
            .filter(|post| &post.channel_id == channel_id && post.create_at >= since)
            .cloned()
            .collect())
    }

    async fn update_post_body(&self, id: &PostId, message: &str) -> Result<(), StoreError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StoreError::StorageFailed {
                reason: "updates disabled".to_string(),
            });
        }

        let mut state = self.state.write().await;
        let post = state
            .posts
            .get_mut(id)
            .ok_or_else(|| StoreError::PostNotFound { id: id.clone() })?;
        post.message = message.to_string();
        state
            .body_history
            .entry(id.clone())
            .or_default()
            .push(message.to_string());
        Ok(())
    }

    async fn create_post(&self, post: Post) -> Result<Post, StoreError> {
        let mut state = self.state.write().await;
        if state.posts.contains_key(&post.id) {
            return Err(StoreError::PostAlreadyExists {
                id: post.id.clone(),
            });
        }
        if let Some(root_id) = &post.root_id
            && !state.posts.contains_key(root_id)
        {
            return Err(StoreError::ThreadNotFound {
                root_id: root_id.clone(),
            });
        }

        state.order.push(post.id.clone());
        state.posts.insert(post.id.clone(), post.clone());
        Ok(post)
    }

    async fn add_reaction(&self, reaction: &Reaction) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if !state.posts.contains_key(&reaction.post_id) {
            return Err(StoreError::PostNotFound {
                id: reaction.post_id.clone(),
            });
        }

        let reactions = state.reactions.entry(reaction.post_id.clone()).or_default();
        if !reactions.contains(reaction) {
            reactions.push(reaction.clone());
        }
        Ok(())
    }

    async fn get_user(&self, id: &UserId) -> Result<User, StoreError> {
        let state = self.state.read().await;
        state
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::UserNotFound { id: id.clone() })
    }

    async fn get_channel(&self, id: &ChannelId) -> Result<Channel, StoreError> {
        let state = self.state.read().await;
        state
            .channels
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::ChannelNotFound { id: id.clone() })
    }
}

#[async_trait]
impl Authorizer for InMemoryPlatform {
    async fn can_read(&self, user_id: &UserId, channel_id: &ChannelId) -> Result<bool, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .members
            .get(channel_id)
            .is_some_and(|members| members.contains(user_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str, author: &str, text: &str) -> Post {
        Post::new(UserId::new(author), ChannelId::new("c1"), text).with_id(id)
    }

    #[tokio::test]
    async fn thread_is_root_first_in_insertion_order() {
        let platform = InMemoryPlatform::new();
        platform.insert_post(post("root", "alice", "q1")).await;
        platform
            .insert_post(post("other", "bob", "unrelated"))
            .await;
        platform
            .insert_post(post("r1", "bot", "a1").in_thread(PostId::new("root")))
            .await;
        platform
            .insert_post(post("r2", "alice", "q2").in_thread(PostId::new("root")))
            .await;

        let thread = platform
            .get_thread(&PostId::new("root"))
            .await
            .expect("thread exists");
        let ids: Vec<&str> = thread.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["root", "r1", "r2"]);
    }

    #[tokio::test]
    async fn missing_thread_is_not_found() {
        let platform = InMemoryPlatform::new();
        let err = platform
            .get_thread(&PostId::new("nope"))
            .await
            .expect_err("no such thread");
        assert!(matches!(err, StoreError::ThreadNotFound { .. }));
    }

    #[tokio::test]
    async fn update_post_body_records_history() {
        let platform = InMemoryPlatform::new();
        platform.insert_post(post("p1", "bot", "")).await;

        platform
            .update_post_body(&PostId::new("p1"), "Hel")
            .await
            .expect("update");
        platform
            .update_post_body(&PostId::new("p1"), "Hello")
            .await
            .expect("update");

        let stored = platform.get_post(&PostId::new("p1")).await.expect("post");
        assert_eq!(stored.message, "Hello");
        assert_eq!(
            platform.body_history(&PostId::new("p1")).await,
            vec!["Hel".to_string(), "Hello".to_string()]
        );
    }

    #[tokio::test]
    async fn failing_updates_report_storage_error() {
        let platform = InMemoryPlatform::new();
        platform.insert_post(post("p1", "bot", "")).await;
        platform.set_fail_updates(true);

        let err = platform
            .update_post_body(&PostId::new("p1"), "x")
            .await
            .expect_err("updates disabled");
        assert!(matches!(err, StoreError::StorageFailed { .. }));
    }

    #[tokio::test]
    async fn create_reply_requires_existing_root() {
        let platform = InMemoryPlatform::new();
        let orphan = post("p2", "bot", "").in_thread(PostId::new("missing"));
        let err = platform.create_post(orphan).await.expect_err("no root");
        assert!(matches!(err, StoreError::ThreadNotFound { .. }));
    }

    #[tokio::test]
    async fn can_read_follows_membership() {
        let platform = InMemoryPlatform::new();
        let channel = ChannelId::new("c1");
        platform.add_member(&channel, &UserId::new("alice")).await;

        assert!(
            platform
                .can_read(&UserId::new("alice"), &channel)
                .await
                .expect("check")
        );
        assert!(
            !platform
                .can_read(&UserId::new("mallory"), &channel)
                .await
                .expect("check")
        );
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected_and_thread_stays_intact() {
        let platform = InMemoryPlatform::new();
        platform.insert_post(post("root", "alice", "q1")).await;
        let reply = post("r1", "bot", "a1").in_thread(PostId::new("root"));
        platform.create_post(reply.clone()).await.expect("first create");

        let err = platform.create_post(reply).await.expect_err("same id");
        assert_eq!(
            err,
            StoreError::PostAlreadyExists {
                id: PostId::new("r1")
            }
        );

        let thread = platform
            .get_thread(&PostId::new("root"))
            .await
            .expect("thread exists");
        let ids: Vec<&str> = thread.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["root", "r1"]);
    }

    #[tokio::test]
    async fn reply_is_not_a_thread_root() {
        let platform = InMemoryPlatform::new();
        platform.insert_post(post("root", "alice", "q1")).await;
        platform
            .insert_post(post("r1", "bot", "a1").in_thread(PostId::new("root")))
            .await;

        let err = platform
            .get_thread(&PostId::new("r1"))
            .await
            .expect_err("reply id");
        assert_eq!(
            err,
            StoreError::ThreadNotFound {
                root_id: PostId::new("r1")
            }
        );
    }

    #[tokio::test]
    async fn posts_since_filter_by_channel_and_time() {
        let platform = InMemoryPlatform::new();
        let cutoff = Utc::now();
        let before = cutoff - chrono::Duration::hours(1);
        let after = cutoff + chrono::Duration::minutes(5);

        platform
            .insert_post(post("old", "alice", "yesterday").with_create_at(before))
            .await;
        platform
            .insert_post(post("new", "alice", "today").with_create_at(after))
            .await;
        platform
            .insert_post(
                post("reply", "bob", "re").in_thread(PostId::new("old")).with_create_at(after),
            )
            .await;
        platform
            .insert_post(
                Post::new(UserId::new("bob"), ChannelId::new("c2"), "elsewhere")
                    .with_create_at(after),
            )
            .await;

        let posts = platform
            .get_posts_since(&ChannelId::new("c1"), cutoff)
            .await
            .expect("lists");
        let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "reply"]);
    }

    #[tokio::test]
    async fn reactions_are_added_once() {
        let platform = InMemoryPlatform::new();
        platform.insert_post(post("p1", "alice", "ship it")).await;
        let reaction = Reaction::new(PostId::new("p1"), UserId::new("bot"), "rocket");

        platform.add_reaction(&reaction).await.expect("adds");
        platform.add_reaction(&reaction).await.expect("adds again");

        assert_eq!(platform.reactions(&PostId::new("p1")).await, vec![reaction]);

        let err = platform
            .add_reaction(&Reaction::new(PostId::new("gone"), UserId::new("bot"), "x"))
            .await
            .expect_err("no post");
        assert!(matches!(err, StoreError::PostNotFound { .. }));
    }
}
