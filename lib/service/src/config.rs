//! Service configuration.
//!
//! Loaded via the `config` crate from environment variables prefixed with
//! `PARLEY_`. Nested keys use `__`, e.g. `PARLEY_STREAMING__ENABLED=false`.

use parley_ai::prompt::DIRECT_MESSAGE_QUESTION;
use parley_core::UserId;
use serde::Deserialize;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "PARLEY";

/// Assistant configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// User ID the bot posts as.
    pub bot_id: UserId,

    /// Prompt template used to answer and regenerate replies.
    #[serde(default = "default_reply_prompt")]
    pub reply_prompt: String,

    /// Log filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Streaming configuration.
    #[serde(default)]
    pub streaming: StreamingConfig,
}

/// Streaming-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamingConfig {
    /// Whether replies are streamed into their post chunk by chunk.
    /// When disabled the whole answer is written once.
    #[serde(default = "default_streaming_enabled")]
    pub enabled: bool,
}

fn default_reply_prompt() -> String {
    DIRECT_MESSAGE_QUESTION.to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_streaming_enabled() -> bool {
    true
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            enabled: default_streaming_enabled(),
        }
    }
}

impl ServiceConfig {
    /// Creates a configuration with defaults for everything but the bot ID.
    #[must_use]
    pub fn new(bot_id: UserId) -> Self {
        Self {
            bot_id,
            reply_prompt: default_reply_prompt(),
            log_filter: default_log_filter(),
            streaming: StreamingConfig::default(),
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(config::Environment::with_prefix(ENV_PREFIX))
    }

    fn from_environment(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                environment
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
