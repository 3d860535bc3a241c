//! Channel domain type.

use parley_core::ChannelId;
use serde::{Deserialize, Serialize};

/// A channel on the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Platform channel ID.
    pub id: ChannelId,
    /// Unique channel handle.
    pub name: String,
    /// Human-friendly name, if any.
    pub display_name: Option<String>,
}

impl Channel {
    /// Creates a channel.
    #[must_use]
    pub fn new(id: ChannelId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            display_name: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}
