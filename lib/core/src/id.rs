//! Strongly-typed ID types for domain entities.
//!
//! Posts, users and channels are owned by the external message store, which
//! hands out opaque string identifiers. The wrappers keep those strings from
//! being mixed up with one another while staying cheap to compare and hash.
//! Identifiers minted locally (for example by the in-memory store) are
//! lowercase ULIDs, so they sort by creation time.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use ulid::Ulid;

/// Macro to generate a strongly-typed ID wrapper around an opaque string.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps an identifier issued by the message store.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Mints a fresh identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(Ulid::new().to_string().to_lowercase())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns true if the identifier is the empty string.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

define_id!(
    /// Unique identifier for a post (a single message in a channel).
    PostId
);

define_id!(
    /// Unique identifier for a user, including bot accounts.
    UserId
);

define_id!(
    /// Unique identifier for a channel.
    ChannelId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_lowercase_ulids() {
        let id = PostId::generate();
        assert_eq!(id.as_str().len(), 26);
        assert_eq!(id.as_str(), id.as_str().to_lowercase());
    }

    #[test]
    fn generated_ids_are_unique() {
        use std::collections::HashSet;

        let ids: HashSet<UserId> = (0..64).map(|_| UserId::generate()).collect();
        assert_eq!(ids.len(), 64);
    }

    #[test]
    fn id_equality_with_str() {
        let id = UserId::new("bot");
        assert_eq!(id, "bot");
        assert_eq!(id, *"bot");
        assert_ne!(id, UserId::new("alice"));
    }

    #[test]
    fn id_lookup_by_str() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(PostId::new("p1"), 1);
        assert_eq!(map.get("p1"), Some(&1));
    }

    #[test]
    fn id_serde_is_transparent() {
        let id = ChannelId::new("town-square");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"town-square\"");
        let parsed: ChannelId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(id, parsed);
    }
}
