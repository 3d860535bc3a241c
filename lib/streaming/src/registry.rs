//! Registry of active streaming sessions.
//!
//! One session per target post. The session records who asked for the
//! generation so that only they can stop it, and owns the cancellation
//! token the writer and the engine watch.

use crate::error::StreamError;
use chrono::{DateTime, Utc};
use parley_core::{PostId, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// An active streaming generation.
#[derive(Debug, Clone)]
pub struct StreamSession {
    /// The post being written.
    pub post_id: PostId,
    /// The user who requested the generation.
    pub requester_id: UserId,
    /// Fires when the generation should stop.
    pub cancel: CancellationToken,
    /// When the session began.
    pub started_at: DateTime<Utc>,
}

/// Registry of streaming sessions keyed by post.
///
/// Clone is cheap (Arc-based); every clone sees the same sessions.
#[derive(Debug, Clone, Default)]
pub struct StreamRegistry {
    sessions: Arc<Mutex<HashMap<PostId, StreamSession>>>,
}

impl StreamRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session for `post_id` and returns its cancellation token.
    ///
    /// # Errors
    ///
    /// Returns `SessionAlreadyActive` if the post already has a session.
    pub fn begin(
        &self,
        post_id: &PostId,
        requester_id: &UserId,
    ) -> Result<CancellationToken, StreamError> {
        let mut sessions = self.lock();
        if sessions.contains_key(post_id) {
            return Err(StreamError::SessionAlreadyActive {
                post_id: post_id.clone(),
            });
        }

        let cancel = CancellationToken::new();
        sessions.insert(
            post_id.clone(),
            StreamSession {
                post_id: post_id.clone(),
                requester_id: requester_id.clone(),
                cancel: cancel.clone(),
                started_at: Utc::now(),
            },
        );
        debug!(post_id = %post_id, requester_id = %requester_id, "stream session registered");
        Ok(cancel)
    }

    /// Signals the session for `post_id` to stop.
    ///
    /// The session stays registered until its writer calls [`end`](Self::end).
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no session, or `Forbidden` if
    /// `requester_id` did not begin it.
    pub fn cancel(&self, post_id: &PostId, requester_id: &UserId) -> Result<(), StreamError> {
        let sessions = self.lock();
        let session = sessions.get(post_id).ok_or_else(|| StreamError::NotFound {
            post_id: post_id.clone(),
        })?;
        if &session.requester_id != requester_id {
            return Err(StreamError::Forbidden {
                post_id: post_id.clone(),
            });
        }

        session.cancel.cancel();
        info!(post_id = %post_id, requester_id = %requester_id, "stream cancellation requested");
        Ok(())
    }

    /// Removes the session for `post_id`, if any.
    pub fn end(&self, post_id: &PostId) {
        if self.lock().remove(post_id).is_some() {
            debug!(post_id = %post_id, "stream session ended");
        }
    }

    /// Returns true if `post_id` has a session.
    #[must_use]
    pub fn is_active(&self, post_id: &PostId) -> bool {
        self.lock().contains_key(post_id)
    }

    /// Returns the number of sessions.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    /// Returns a copy of the session for `post_id`.
    #[must_use]
    pub fn session(&self, post_id: &PostId) -> Option<StreamSession> {
        self.lock().get(post_id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PostId, StreamSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (PostId, UserId) {
        (PostId::new("p1"), UserId::new("alice"))
    }

    #[test]
    fn begin_and_cancel() {
        let registry = StreamRegistry::new();
        let (post, alice) = ids();

        let token = registry.begin(&post, &alice).expect("registers");
        assert!(!token.is_cancelled());
        assert!(registry.is_active(&post));

        registry.cancel(&post, &alice).expect("cancels");
        assert!(token.is_cancelled());
        assert!(registry.is_active(&post));
    }

    #[test]
    fn double_begin_is_rejected() {
        let registry = StreamRegistry::new();
        let (post, alice) = ids();

        let first = registry.begin(&post, &alice).expect("registers");
        let err = registry
            .begin(&post, &UserId::new("bob"))
            .expect_err("already active");

        assert_eq!(err, StreamError::SessionAlreadyActive { post_id: post.clone() });
        assert_eq!(registry.active_count(), 1);
        assert_eq!(
            registry.session(&post).map(|s| s.requester_id),
            Some(alice)
        );
        assert!(!first.is_cancelled());
    }

    #[test]
    fn foreign_cancel_is_forbidden_without_side_effect() {
        let registry = StreamRegistry::new();
        let (post, alice) = ids();
        let token = registry.begin(&post, &alice).expect("registers");

        let err = registry
            .cancel(&post, &UserId::new("mallory"))
            .expect_err("not the requester");

        assert_eq!(err, StreamError::Forbidden { post_id: post.clone() });
        assert!(!token.is_cancelled());
        assert!(registry.is_active(&post));
    }

    #[test]
    fn cancel_after_end_is_not_found() {
        let registry = StreamRegistry::new();
        let (post, alice) = ids();
        registry.begin(&post, &alice).expect("registers");

        registry.end(&post);
        registry.end(&post);

        assert_eq!(
            registry.cancel(&post, &alice),
            Err(StreamError::NotFound { post_id: post.clone() })
        );
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn post_can_stream_again_after_end() {
        let registry = StreamRegistry::new();
        let (post, alice) = ids();

        let old = registry.begin(&post, &alice).expect("registers");
        registry.cancel(&post, &alice).expect("cancels");
        registry.end(&post);

        let fresh = registry.begin(&post, &alice).expect("registers again");
        assert!(old.is_cancelled());
        assert!(!fresh.is_cancelled());
    }

    #[test]
    fn clones_share_sessions() {
        let registry = StreamRegistry::new();
        let handle = registry.clone();
        let (post, alice) = ids();

        registry.begin(&post, &alice).expect("registers");
        assert!(handle.is_active(&post));
        handle.end(&post);
        assert!(!registry.is_active(&post));
    }

    #[tokio::test]
    async fn concurrent_begins_admit_one_writer() {
        let registry = StreamRegistry::new();
        let post = PostId::new("contested");

        let attempts: Vec<_> = (0..16)
            .map(|i| {
                let registry = registry.clone();
                let post = post.clone();
                tokio::spawn(async move { registry.begin(&post, &UserId::new(format!("u{i}"))) })
            })
            .collect();

        let mut admitted = 0;
        for attempt in attempts {
            if attempt.await.expect("task joins").is_ok() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
        assert_eq!(registry.active_count(), 1);
    }
}
