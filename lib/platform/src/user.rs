//! User domain type.
//!
//! A user is any account that can author posts, including the bot itself.
//! Users are owned by the platform; parley only reads them to fill in
//! prompt context and to compare authorship.

use parley_core::UserId;
use serde::{Deserialize, Serialize};

/// An account on the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Platform user ID.
    id: UserId,
    /// Unique handle (e.g. "alice").
    username: String,
    /// Human-friendly name, if the user set one.
    display_name: Option<String>,
}

impl User {
    /// Creates a user with the given ID and username.
    #[must_use]
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            display_name: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Returns the user's platform ID.
    #[must_use]
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the display name, if set.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Returns the display name, falling back to the username.
    #[must_use]
    pub fn preferred_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferred_name_falls_back_to_username() {
        let user = User::new(UserId::new("u1"), "alice");
        assert_eq!(user.preferred_name(), "alice");

        let user = user.with_display_name("Alice Liddell");
        assert_eq!(user.preferred_name(), "Alice Liddell");
        assert_eq!(user.username(), "alice");
    }
}
