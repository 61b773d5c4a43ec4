//! Newtype wrappers around [`uuid::Uuid`] for domain identifiers.
//!
//! Using distinct types prevents accidentally passing an `AttachmentId`
//! where an `ArticleId` is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to define a newtype ID wrapper around `Uuid`.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Return the inner UUID value.
            pub fn into_uuid(self) -> Uuid {
                self.0
            }

            /// Return a reference to the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

define_id!(
    /// Identifier of the article that owns a set of attachments.
    ArticleId
);

define_id!(
    /// Identifier of a single attachment file record.
    AttachmentId
);

impl ArticleId {
    /// First eight characters of the hyphenated id.
    pub fn short_prefix(&self) -> String {
        self.0.hyphenated().to_string().chars().take(8).collect()
    }

    /// First four characters of the second dash-delimited segment.
    pub fn second_segment(&self) -> String {
        self.0
            .hyphenated()
            .to_string()
            .split('-')
            .nth(1)
            .map(|s| s.chars().take(4).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_id_new() {
        let id1 = ArticleId::new();
        let id2 = ArticleId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_article_id_from_str() {
        let uuid = Uuid::new_v4();
        let id: ArticleId = uuid.to_string().parse().expect("should parse");
        assert_eq!(id.0, uuid);
    }

    #[test]
    fn test_short_prefix_and_segment() {
        let id: ArticleId = "39dab4d8-f600-4c1e-9a51-0c7d2b1e8f00".parse().unwrap();
        assert_eq!(id.short_prefix(), "39dab4d8");
        assert_eq!(id.second_segment(), "f600");
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = AttachmentId::new();
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, format!("\"{}\"", id.0));
    }
}
