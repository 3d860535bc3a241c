//! Core domain types and utilities for parley.
//!
//! This crate provides the identifiers shared by every layer (posts, users,
//! channels) and the error taxonomy that lets a failure keep its kind while
//! it propagates from the message store or completion engine up to the
//! request handlers.

pub mod error;
pub mod id;

pub use error::{ErrorKind, Result};
pub use id::{ChannelId, PostId, UserId};
