//! Request-level assistant flows.
//!
//! Every flow that targets a post starts by checking that the caller may
//! read the post's channel. Generation flows then build a conversation
//! (rendered prompt followed by the translated thread) and hand it to the
//! stream writer, which owns the post until the stream ends.
//!
//! Regeneration claims the post's stream session before touching the body,
//! so a request that loses the race leaves the live post alone.

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use chrono::{DateTime, Utc};
use parley_ai::prompt::{
    ASK_AI_CHANGE_TEXT, EMOJI_REACTION, SUMMARIZE_CHANNEL_SINCE, SUMMARIZE_THREAD,
};
use parley_ai::{CompletionEngine, Feedback, FeedbackStats, FeedbackStore, PromptRegistry};
use parley_conversation::{
    Conversation, ConversationContext, ThreadResolver, ThreadSnapshot, thread_to_conversation,
};
use parley_core::{ChannelId, PostId, Result, UserId};
use parley_platform::{
    Authorizer, MessageStore, Post, REQUESTER_PROP, Reaction, STREAM_TARGET_PROP,
};
use parley_streaming::{StreamRegistry, StreamTask, StreamWriter};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// A bot post created in answer to a request.
#[derive(Debug)]
pub struct Reply {
    /// The bot post as created.
    pub post: Post,
    /// The stream writing the answer, when streaming is enabled.
    pub stream: Option<StreamTask>,
}

/// All feedback plus its tally.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackReport {
    /// Aggregate counts.
    pub stats: FeedbackStats,
    /// Records, most recent first.
    pub records: Vec<Feedback>,
}

/// The assistant: conversation building, streaming replies and feedback.
pub struct Assistant {
    config: ServiceConfig,
    store: Arc<dyn MessageStore>,
    authorizer: Arc<dyn Authorizer>,
    engine: Arc<dyn CompletionEngine>,
    feedback: Arc<dyn FeedbackStore>,
    prompts: PromptRegistry,
    resolver: ThreadResolver<dyn MessageStore>,
    writer: StreamWriter<dyn MessageStore>,
}

impl Assistant {
    /// Creates an assistant with the built-in prompt templates and a fresh
    /// stream registry.
    pub fn new(
        config: ServiceConfig,
        store: Arc<dyn MessageStore>,
        authorizer: Arc<dyn Authorizer>,
        engine: Arc<dyn CompletionEngine>,
        feedback: Arc<dyn FeedbackStore>,
    ) -> Self {
        Self {
            config,
            resolver: ThreadResolver::new(Arc::clone(&store)),
            writer: StreamWriter::new(Arc::clone(&store), StreamRegistry::new()),
            store,
            authorizer,
            engine,
            feedback,
            prompts: PromptRegistry::with_defaults(),
        }
    }

    /// Replaces the prompt templates.
    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptRegistry) -> Self {
        self.prompts = prompts;
        self
    }

    /// Shares an existing stream registry.
    #[must_use]
    pub fn with_stream_registry(mut self, registry: StreamRegistry) -> Self {
        self.writer = StreamWriter::new(Arc::clone(&self.store), registry);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Returns the registry of active streams.
    #[must_use]
    pub fn streams(&self) -> &StreamRegistry {
        self.writer.registry()
    }

    /// Renders a named prompt against `context`.
    pub fn build_conversation(
        &self,
        prompt_name: &str,
        context: &ConversationContext,
    ) -> Result<Conversation, ServiceError> {
        Ok(self
            .prompts
            .build(prompt_name, context)
            .map_err(ServiceError::from)?)
    }

    /// Translates posts into a conversation from the bot's point of view.
    #[must_use]
    pub fn translate_thread(&self, posts: &[Post]) -> Conversation {
        thread_to_conversation(&self.config.bot_id, posts)
    }

    /// Loads the thread rooted at `root_id`.
    pub async fn resolve_thread(
        &self,
        root_id: &PostId,
    ) -> Result<ThreadSnapshot, ServiceError> {
        Ok(self
            .resolver
            .resolve(root_id)
            .await
            .map_err(ServiceError::from)?)
    }

    /// Loads a post, requiring that `user_id` may read its channel.
    #[instrument(skip(self))]
    pub async fn authorize_post(
        &self,
        user_id: &UserId,
        post_id: &PostId,
    ) -> Result<Post, ServiceError> {
        let post = self
            .store
            .get_post(post_id)
            .await
            .map_err(ServiceError::from)?;
        let allowed = self
            .authorizer
            .can_read(user_id, &post.channel_id)
            .await
            .map_err(ServiceError::from)?;
        if !allowed {
            return Err(ServiceError::Forbidden {
                user_id: user_id.clone(),
                post_id: post_id.clone(),
            }
            .into());
        }
        Ok(post)
    }

    /// Stops the stream writing into a bot post.
    ///
    /// Only the user who requested the post may stop it.
    #[instrument(skip(self))]
    pub async fn stop(&self, user_id: &UserId, post_id: &PostId) -> Result<(), ServiceError> {
        let post = self.authorize_post(user_id, post_id).await?;
        self.require_bot_post(&post)?;

        if post.requester_id().as_ref() != Some(user_id) {
            return Err(ServiceError::Forbidden {
                user_id: user_id.clone(),
                post_id: post_id.clone(),
            }
            .into());
        }

        self.streams()
            .cancel(post_id, user_id)
            .map_err(ServiceError::from)?;
        info!(post_id = %post_id, "stop requested");
        Ok(())
    }

    /// Generates a bot post again, from the question that preceded it.
    ///
    /// The thread is cut at that question, which must have been written by
    /// the caller. The post's stream session is claimed first; only then is
    /// the body cleared and a new answer streamed in. A post that is still
    /// streaming fails with `SessionAlreadyActive` and keeps its body.
    #[instrument(skip(self))]
    pub async fn regenerate(
        &self,
        user_id: &UserId,
        post_id: &PostId,
    ) -> Result<StreamTask, ServiceError> {
        let post = self.authorize_post(user_id, post_id).await?;
        self.require_bot_post(&post)?;

        let root_id = post.thread_root_id();
        let mut thread = self.resolve_thread(&root_id).await?;
        let question_id = thread
            .predecessor_of(post_id)
            .map(|question| question.id.clone())
            .ok_or_else(|| ServiceError::BadRequest {
                post_id: post_id.clone(),
                reason: "no question precedes this post".to_string(),
            })?;
        thread.truncate_at(&question_id);

        let question = thread.latest().map_err(ServiceError::from)?.clone();
        if !question.is_authored_by(user_id) {
            return Err(ServiceError::Forbidden {
                user_id: user_id.clone(),
                post_id: post_id.clone(),
            }
            .into());
        }

        let claim = self
            .writer
            .claim(post_id.clone(), user_id)
            .map_err(ServiceError::from)?;

        let conversation = self.reply_conversation(user_id, &thread, question).await?;
        self.store
            .update_post_body(post_id, "")
            .await
            .map_err(ServiceError::from)?;

        debug!(post_id = %post_id, messages = conversation.len(), "regenerating");
        Ok(self
            .writer
            .start(claim, Arc::clone(&self.engine), conversation))
    }

    /// Answers a user post with a new bot post in its thread.
    #[instrument(skip(self))]
    pub async fn reply(
        &self,
        user_id: &UserId,
        post_id: &PostId,
    ) -> Result<Reply, ServiceError> {
        let post = self.authorize_post(user_id, post_id).await?;
        if post.is_authored_by(&self.config.bot_id) {
            return Err(ServiceError::BadRequest {
                post_id: post_id.clone(),
                reason: "cannot reply to a bot post".to_string(),
            }
            .into());
        }

        let root_id = post.thread_root_id();
        let mut thread = self.resolve_thread(&root_id).await?;
        if !thread.truncate_at(post_id) {
            return Err(ServiceError::PostNotInThread {
                post_id: post_id.clone(),
                root_id,
            }
            .into());
        }

        let conversation = self.reply_conversation(user_id, &thread, post.clone()).await?;
        let answer = self.new_bot_post(&post, user_id).in_thread(root_id);
        self.answer_into(answer, user_id, conversation).await
    }

    /// Starts a new thread summarizing the thread that contains `post_id`.
    #[instrument(skip(self))]
    pub async fn summarize(
        &self,
        user_id: &UserId,
        post_id: &PostId,
    ) -> Result<Reply, ServiceError> {
        let post = self.authorize_post(user_id, post_id).await?;
        let thread = self.resolve_thread(&post.thread_root_id()).await?;
        let context = self.derived_context(user_id, &post.channel_id, None).await?;

        let mut conversation = self.build_conversation(SUMMARIZE_THREAD, &context)?;
        conversation.append_conversation(thread.to_conversation(&self.config.bot_id));

        let answer = self.new_bot_post(&post, user_id);
        self.answer_into(answer, user_id, conversation).await
    }

    /// Summarizes what was posted in a channel since `since`, replies
    /// included, and returns the summary.
    #[instrument(skip(self))]
    pub async fn summarize_since(
        &self,
        user_id: &UserId,
        channel_id: &ChannelId,
        since: DateTime<Utc>,
    ) -> Result<String, ServiceError> {
        let allowed = self
            .authorizer
            .can_read(user_id, channel_id)
            .await
            .map_err(ServiceError::from)?;
        if !allowed {
            return Err(ServiceError::ChannelForbidden {
                user_id: user_id.clone(),
                channel_id: channel_id.clone(),
            }
            .into());
        }

        let posts = self
            .store
            .get_posts_since(channel_id, since)
            .await
            .map_err(ServiceError::from)?;
        if posts.is_empty() {
            return Err(ServiceError::NothingToSummarize {
                channel_id: channel_id.clone(),
            }
            .into());
        }

        let context = self.derived_context(user_id, channel_id, None).await?;
        let mut conversation = self.build_conversation(SUMMARIZE_CHANNEL_SINCE, &context)?;
        conversation.append_conversation(self.translate_thread(&posts));

        let summary = self
            .engine
            .complete(&conversation)
            .await
            .map_err(ServiceError::from)?;
        info!(channel_id = %channel_id, posts = posts.len(), "channel summarized");
        Ok(summary)
    }

    /// Has the bot react to a post with an emoji the engine picks.
    ///
    /// Returns the emoji name that was added.
    #[instrument(skip(self))]
    pub async fn react(&self, user_id: &UserId, post_id: &PostId) -> Result<String, ServiceError> {
        let post = self.authorize_post(user_id, post_id).await?;
        let channel_id = post.channel_id.clone();
        let context = self.derived_context(user_id, &channel_id, Some(post)).await?;
        let conversation = self.build_conversation(EMOJI_REACTION, &context)?;

        let answer = self
            .engine
            .complete(&conversation)
            .await
            .map_err(ServiceError::from)?;
        let Some(emoji) = emoji_name(&answer) else {
            return Err(ServiceError::NotAnEmoji { answer }.into());
        };

        let reaction = Reaction::new(post_id.clone(), self.config.bot_id.clone(), emoji.as_str());
        self.store
            .add_reaction(&reaction)
            .await
            .map_err(ServiceError::from)?;
        info!(post_id = %post_id, emoji = %emoji, "reacted");
        Ok(emoji)
    }

    /// Records thumbs up or down on a post, replacing earlier feedback.
    #[instrument(skip(self))]
    pub async fn record_feedback(
        &self,
        user_id: &UserId,
        post_id: &PostId,
        positive: bool,
    ) -> Result<Feedback, ServiceError> {
        self.authorize_post(user_id, post_id).await?;
        Ok(self
            .feedback
            .record_feedback(post_id, user_id, positive)
            .await
            .map_err(ServiceError::from)?)
    }

    /// Lists all feedback with its tally.
    pub async fn feedback_report(&self) -> Result<FeedbackReport, ServiceError> {
        let records = self
            .feedback
            .list_feedback()
            .await
            .map_err(ServiceError::from)?;
        Ok(FeedbackReport {
            stats: FeedbackStats::tally(&records),
            records,
        })
    }

    /// Runs a parameters-only prompt, such as `simplify_text`, and returns
    /// the whole answer.
    #[instrument(skip(self, params))]
    pub async fn run_text_prompt(
        &self,
        user_id: &UserId,
        prompt_name: &str,
        params: HashMap<String, String>,
    ) -> Result<String, ServiceError> {
        self.store.get_user(user_id).await.map_err(ServiceError::from)?;

        let context = ConversationContext::parameters_only(params);
        let conversation = self.build_conversation(prompt_name, &context)?;
        Ok(self
            .engine
            .complete(&conversation)
            .await
            .map_err(ServiceError::from)?)
    }

    /// Rewrites `message` the way `ask` describes.
    pub async fn change_text(
        &self,
        user_id: &UserId,
        message: &str,
        ask: &str,
    ) -> Result<String, ServiceError> {
        let params = HashMap::from([
            ("message".to_string(), message.to_string()),
            ("ask".to_string(), ask.to_string()),
        ]);
        self.run_text_prompt(user_id, ASK_AI_CHANGE_TEXT, params).await
    }

    fn require_bot_post(&self, post: &Post) -> Result<(), ServiceError> {
        if post.is_authored_by(&self.config.bot_id) {
            Ok(())
        } else {
            Err(ServiceError::BadRequest {
                post_id: post.id.clone(),
                reason: "not a bot post".to_string(),
            }
            .into())
        }
    }

    /// Builds `reply_prompt` for `question` followed by the thread.
    async fn reply_conversation(
        &self,
        user_id: &UserId,
        thread: &ThreadSnapshot,
        question: Post,
    ) -> Result<Conversation, ServiceError> {
        let channel_id = question.channel_id.clone();
        let context = self
            .derived_context(user_id, &channel_id, Some(question))
            .await?;

        let mut conversation = self.build_conversation(&self.config.reply_prompt, &context)?;
        conversation.append_conversation(thread.to_conversation(&self.config.bot_id));
        Ok(conversation)
    }

    /// Context for a request by `user_id` in `channel_id`.
    async fn derived_context(
        &self,
        user_id: &UserId,
        channel_id: &ChannelId,
        post: Option<Post>,
    ) -> Result<ConversationContext, ServiceError> {
        let user = self.store.get_user(user_id).await.map_err(ServiceError::from)?;
        let channel = self
            .store
            .get_channel(channel_id)
            .await
            .map_err(ServiceError::from)?;
        Ok(ConversationContext::new(Some(user), Some(channel), post))
    }

    fn new_bot_post(&self, source: &Post, user_id: &UserId) -> Post {
        Post::new(self.config.bot_id.clone(), source.channel_id.clone(), "")
            .with_prop(REQUESTER_PROP, serde_json::json!(user_id.as_str()))
    }

    /// Creates `answer` and fills it with the engine's response.
    async fn answer_into(
        &self,
        answer: Post,
        user_id: &UserId,
        conversation: Conversation,
    ) -> Result<Reply, ServiceError> {
        if !self.config.streaming.enabled {
            let text = self
                .engine
                .complete(&conversation)
                .await
                .map_err(ServiceError::from)?;
            let mut answer = answer;
            answer.message = text;
            let post = self
                .store
                .create_post(answer)
                .await
                .map_err(ServiceError::from)?;
            return Ok(Reply { post, stream: None });
        }

        let post = self
            .store
            .create_post(answer.with_prop(STREAM_TARGET_PROP, serde_json::json!(true)))
            .await
            .map_err(ServiceError::from)?;
        let stream = self
            .writer
            .spawn(post.id.clone(), user_id, Arc::clone(&self.engine), conversation)
            .map_err(ServiceError::from)?;
        Ok(Reply {
            post,
            stream: Some(stream),
        })
    }
}

/// Normalizes an engine answer into an emoji short name.
fn emoji_name(answer: &str) -> Option<String> {
    let name = answer.trim().trim_matches(':').to_ascii_lowercase();
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-'));
    valid.then_some(name)
}
