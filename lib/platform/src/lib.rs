//! Boundary to the external chat platform for parley.
//!
//! The platform owns posts, users and channels. This crate provides:
//! - Domain types for those records (`Post`, `User`, `Channel`)
//! - The `MessageStore` port used to read threads and write bot replies
//! - The `Authorizer` port consulted before any thread is touched
//! - `InMemoryPlatform`, an implementation of both ports for tests and
//!   local development
//!
//! # Example
//!
//! ```
//! use parley_platform::{Post, User};
//! use parley_core::{ChannelId, UserId};
//!
//! let alice = User::new(UserId::new("alice"), "alice");
//! let question = Post::new(alice.id().clone(), ChannelId::new("dm"), "what is rust?");
//!
//! assert!(question.root_id.is_none());
//! assert_eq!(question.thread_root_id(), question.id);
//! ```

pub mod channel;
pub mod error;
pub mod memory;
pub mod post;
pub mod store;
pub mod user;

// Re-export main types at crate root
pub use channel::Channel;
pub use error::StoreError;
pub use memory::InMemoryPlatform;
pub use post::{Post, REQUESTER_PROP, Reaction, STREAM_TARGET_PROP};
pub use store::{Authorizer, MessageStore};
pub use user::User;
