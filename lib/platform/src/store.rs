//! Ports to the external chat platform.
//!
//! The platform is the system of record for posts, users and channels.
//! parley reads threads through [`MessageStore`], writes bot replies back
//! through it, and asks [`Authorizer`] before touching any thread.

use crate::channel::Channel;
use crate::error::StoreError;
use crate::post::{Post, Reaction};
use crate::user::User;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parley_core::{ChannelId, PostId, UserId};

/// Trait for message storage.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Gets a post by ID.
    async fn get_post(&self, id: &PostId) -> Result<Post, StoreError>;

    /// Gets every post of a thread, root first, in chronological order.
    ///
    /// Fails with `ThreadNotFound` if `root_id` does not name a root post.
    async fn get_thread(&self, root_id: &PostId) -> Result<Vec<Post>, StoreError>;

    /// Gets the posts of a channel created at or after `since`, oldest
    /// first, replies included.
    async fn get_posts_since(
        &self,
        channel_id: &ChannelId,
        since: DateTime<Utc>,
    ) -> Result<Vec<Post>, StoreError>;

    /// Replaces the body of a post.
    async fn update_post_body(&self, id: &PostId, message: &str) -> Result<(), StoreError>;

    /// Creates a post and returns it as stored.
    ///
    /// Fails with `PostAlreadyExists` if the ID is taken.
    async fn create_post(&self, post: Post) -> Result<Post, StoreError>;

    /// Adds a reaction to a post. Adding the same reaction twice is a no-op.
    async fn add_reaction(&self, reaction: &Reaction) -> Result<(), StoreError>;

    /// Gets a user by ID.
    async fn get_user(&self, id: &UserId) -> Result<User, StoreError>;

    /// Gets a channel by ID.
    async fn get_channel(&self, id: &ChannelId) -> Result<Channel, StoreError>;
}

/// Trait for read-permission checks.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Returns true if the user may read the channel.
    async fn can_read(&self, user_id: &UserId, channel_id: &ChannelId) -> Result<bool, StoreError>;
}
