//! Feedback on bot answers.
//!
//! Users rate a bot post up or down. One record is kept per post; rating
//! again replaces the previous record, whoever gave it.

use crate::error::FeedbackError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parley_core::{PostId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// The type of feedback signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackSignal {
    /// The answer was helpful.
    Positive,
    /// The answer was not helpful.
    Negative,
}

impl FeedbackSignal {
    /// Maps a thumbs-up flag onto a signal.
    #[must_use]
    pub fn from_positive(positive: bool) -> Self {
        if positive {
            Self::Positive
        } else {
            Self::Negative
        }
    }

    /// Returns true for [`FeedbackSignal::Positive`].
    #[must_use]
    pub fn is_positive(self) -> bool {
        self == Self::Positive
    }
}

/// A feedback record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    /// The rated bot post.
    pub post_id: PostId,
    /// The user who provided the feedback.
    pub user_id: UserId,
    /// Feedback signal.
    pub signal: FeedbackSignal,
    /// When the feedback was provided.
    pub recorded_at: DateTime<Utc>,
}

impl Feedback {
    /// Creates a feedback record stamped with the current time.
    #[must_use]
    pub fn new(post_id: PostId, user_id: UserId, signal: FeedbackSignal) -> Self {
        Self {
            post_id,
            user_id,
            signal,
            recorded_at: Utc::now(),
        }
    }
}

/// Aggregate statistics about feedback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackStats {
    /// Total feedback records.
    pub total_count: u64,
    /// Positive feedback count.
    pub positive_count: u64,
    /// Negative feedback count.
    pub negative_count: u64,
}

impl FeedbackStats {
    /// Tallies a set of records.
    #[must_use]
    pub fn tally<'a>(records: impl IntoIterator<Item = &'a Feedback>) -> Self {
        records
            .into_iter()
            .fold(Self::default(), |mut stats, record| {
                stats.total_count += 1;
                match record.signal {
                    FeedbackSignal::Positive => stats.positive_count += 1,
                    FeedbackSignal::Negative => stats.negative_count += 1,
                }
                stats
            })
    }
}

/// Trait for storing and retrieving feedback.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Records feedback for a post, replacing any earlier record for it.
    async fn record_feedback(
        &self,
        post_id: &PostId,
        user_id: &UserId,
        positive: bool,
    ) -> Result<Feedback, FeedbackError>;

    /// Retrieves the feedback recorded for a post.
    async fn get_feedback(&self, post_id: &PostId) -> Result<Option<Feedback>, FeedbackError>;

    /// Lists every record, most recently recorded first.
    async fn list_feedback(&self) -> Result<Vec<Feedback>, FeedbackError>;
}

#[derive(Debug, Default)]
struct FeedbackState {
    records: HashMap<PostId, (u64, Feedback)>,
    next_seq: u64,
}

/// Feedback store kept in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFeedbackStore {
    state: Arc<RwLock<FeedbackState>>,
}

impl InMemoryFeedbackStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeedbackStore for InMemoryFeedbackStore {
    async fn record_feedback(
        &self,
        post_id: &PostId,
        user_id: &UserId,
        positive: bool,
    ) -> Result<Feedback, FeedbackError> {
        let feedback = Feedback::new(
            post_id.clone(),
            user_id.clone(),
            FeedbackSignal::from_positive(positive),
        );

        let mut state = self.state.write().await;
        let seq = state.next_seq;
        state.next_seq += 1;
        let replaced = state
            .records
            .insert(post_id.clone(), (seq, feedback.clone()))
            .is_some();

        debug!(post_id = %post_id, user_id = %user_id, positive, replaced, "feedback recorded");
        Ok(feedback)
    }

    async fn get_feedback(&self, post_id: &PostId) -> Result<Option<Feedback>, FeedbackError> {
        let state = self.state.read().await;
        Ok(state.records.get(post_id).map(|(_, feedback)| feedback.clone()))
    }

    async fn list_feedback(&self) -> Result<Vec<Feedback>, FeedbackError> {
        let state = self.state.read().await;
        let mut entries: Vec<&(u64, Feedback)> = state.records.values().collect();
        entries.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(entries.into_iter().map(|(_, feedback)| feedback.clone()).collect())
    }
}
