//! Streaming generation for parley.
//!
//! A bot answer is written into its post chunk by chunk while the model
//! produces it. This crate keeps track of those generations:
//!
//! - [`StreamRegistry`] allows at most one active stream per post and lets
//!   the user who requested a stream, and nobody else, cancel it
//! - [`StreamWriter`] runs one stream as a background task, applying chunks
//!   in order until the engine finishes, fails or the stream is cancelled
//! - [`StreamClaim`] holds a post's session while the caller prepares the
//!   post, before the stream starts
//!
//! Cancellation is cooperative: the registry fires a
//! [`CancellationToken`](tokio_util::sync::CancellationToken) and the writer
//! checks it between chunks. Sessions live in process memory only.

pub mod error;
pub mod registry;
pub mod writer;

pub use error::{StreamError, StreamFailure};
pub use registry::{StreamRegistry, StreamSession};
pub use writer::{StreamClaim, StreamOutcome, StreamTask, StreamWriter};
