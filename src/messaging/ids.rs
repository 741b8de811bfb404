// File: src/messaging/ids.rs

//! Identifier types for the messaging client.
//!
//! Conversation and user identifiers are opaque strings assigned by the
//! portal backend. They are wrapped in validated newtypes so that a value
//! which would corrupt a request path (empty, whitespace, `/`, `?`, `#`,
//! or a bare `.`/`..` that URL parsing resolves as a dot segment) is
//! rejected before any request is built.
//!
//! Request identifiers are generated locally and only used to correlate
//! log lines of a single load or send.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Errors returned when parsing/validating a string identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// Empty (or whitespace-only) identifier.
    Empty,
    /// Exceeds the maximum accepted length.
    TooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual length received.
        got: usize,
    },
    /// Contains a disallowed character.
    InvalidChar {
        /// The invalid character.
        ch: char,
        /// The index where it was found.
        index: usize,
    },
    /// The whole identifier is `.` or `..`.
    DotSegment,
}

impl fmt::Display for IdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "identifier must not be empty"),
            Self::TooLong { max, got } => write!(f, "identifier too long: got {got}, max {max}"),
            Self::InvalidChar { ch, index } => {
                write!(f, "identifier contains invalid character {ch:?} at index {index}")
            }
            Self::DotSegment => write!(f, "identifier must not be a relative path segment"),
        }
    }
}

impl std::error::Error for IdError {}

/// Hard ceiling to prevent pathological payloads.
const MAX_ID_LEN: usize = 128;

fn validate_id(raw: &str) -> Result<&str, IdError> {
    let s = raw.trim();

    if s.is_empty() {
        return Err(IdError::Empty);
    }
    if s.len() > MAX_ID_LEN {
        return Err(IdError::TooLong {
            max: MAX_ID_LEN,
            got: s.len(),
        });
    }

    for (index, ch) in s.chars().enumerate() {
        if ch.is_whitespace() || ch.is_control() || matches!(ch, '/' | '?' | '#') {
            return Err(IdError::InvalidChar { ch, index });
        }
    }
    if matches!(s, "." | "..") {
        return Err(IdError::DotSegment);
    }

    Ok(s)
}

/// Declare a validated string identifier with a consistent API.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Build a validated identifier. Surrounding whitespace is trimmed.
            ///
            /// # Errors
            /// Returns `IdError` if the input is empty, too long, a dot
            /// segment, or contains characters that cannot appear in a path
            /// segment.
            pub fn new(raw: impl AsRef<str>) -> Result<Self, IdError> {
                validate_id(raw.as_ref()).map(|s| Self(s.to_owned()))
            }

            /// Borrow as `&str`.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume into `String`.
            #[inline]
            #[must_use]
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.into_string()
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }
    };
}

define_string_id!(
    /// Identifier of a group, a thread, or (for private conversations) the
    /// other participant.
    ConversationId
);

define_string_id!(
    /// Identifier of the signed-in user, used as `senderId` on outgoing messages.
    UserId
);

/// Correlation identifier for one load or send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct RequestId(pub Uuid);

impl Default for RequestId {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl RequestId {
    /// Create a new random identifier.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_is_trimmed() {
        let id = ConversationId::new("  g1 ");
        assert_eq!(id.map(ConversationId::into_string), Ok("g1".to_string()));
    }

    #[test]
    fn test_id_rejects_empty() {
        assert_eq!(ConversationId::new("   "), Err(IdError::Empty));
        assert_eq!(UserId::new(""), Err(IdError::Empty));
    }

    #[test]
    fn test_id_rejects_path_characters() {
        assert_eq!(
            ConversationId::new("g1/../admin"),
            Err(IdError::InvalidChar { ch: '/', index: 2 })
        );
        assert_eq!(
            ConversationId::new("u1?type=group"),
            Err(IdError::InvalidChar { ch: '?', index: 2 })
        );
        assert!(ConversationId::new("a b").is_err());
    }

    #[test]
    fn test_id_rejects_dot_segments() {
        assert_eq!(ConversationId::new(".."), Err(IdError::DotSegment));
        assert_eq!(ConversationId::new(" . "), Err(IdError::DotSegment));
        assert_eq!(UserId::new(".."), Err(IdError::DotSegment));

        // Dots are fine inside a longer id.
        assert!(ConversationId::new("..a").is_ok());
        assert!(ConversationId::new("a..").is_ok());
        assert!(ConversationId::new("...").is_ok());
    }

    #[test]
    fn test_id_rejects_overlong() {
        let raw = "x".repeat(MAX_ID_LEN + 1);
        assert_eq!(
            ConversationId::new(raw),
            Err(IdError::TooLong {
                max: MAX_ID_LEN,
                got: MAX_ID_LEN + 1
            })
        );
    }

    #[test]
    fn test_id_deserialization_validates() {
        let ok: Result<UserId, _> = serde_json::from_str("\"64f0c2a1e4b0\"");
        assert!(ok.is_ok());

        let bad: Result<UserId, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_request_ids_are_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
    }
}
