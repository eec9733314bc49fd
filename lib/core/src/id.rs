//! Strongly-typed identifiers.
//!
//! Chat addresses and message ids are assigned by the messaging client and
//! treated as opaque strings. Ids minted by the relay itself use ULID format,
//! which gives both uniqueness and temporal ordering in logs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Generates a wrapper around an opaque identifier assigned by the messaging client.
macro_rules! define_external_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier.
            #[must_use]
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Returns the raw identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s.trim().is_empty() {
                    return Err(ParseIdError {
                        id_type: stringify!($name),
                        reason: "identifier is empty".to_string(),
                    });
                }
                Ok(Self(s.to_string()))
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }
    };
}

define_external_id!(
    /// Address of a one-to-one conversation, stable across messages from the same peer.
    ConversationId
);

define_external_id!(
    /// Identifier the messaging client assigned to an inbound message.
    MessageId
);

/// Suffix the messaging client uses for broadcast and status channels.
const BROADCAST_SUFFIX: &str = "@broadcast";

/// Suffix the messaging client uses for group conversations.
const GROUP_SUFFIX: &str = "@g.us";

impl ConversationId {
    /// Returns true for broadcast lists and status channels.
    #[must_use]
    pub fn is_broadcast(&self) -> bool {
        self.0.ends_with(BROADCAST_SUFFIX)
    }

    /// Returns true if the address names a group conversation.
    #[must_use]
    pub fn is_group(&self) -> bool {
        self.0.ends_with(GROUP_SUFFIX)
    }
}

impl MessageId {
    /// Returns a version of the id that is safe to use as a file stem.
    ///
    /// Characters outside `[A-Za-z0-9_-]` are replaced with `_`.
    #[must_use]
    pub fn file_stem(&self) -> String {
        self.0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

/// Unique identifier for one execution of a settle pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettleRunId(Ulid);

impl SettleRunId {
    /// Creates a new run id.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SettleRunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SettleRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "settle_{}", self.0)
    }
}

impl FromStr for SettleRunId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ulid_str = s.strip_prefix("settle_").unwrap_or(s);
        Ulid::from_str(ulid_str)
            .map(Self)
            .map_err(|e| ParseIdError {
                id_type: "SettleRunId",
                reason: e.to_string(),
            })
    }
}
