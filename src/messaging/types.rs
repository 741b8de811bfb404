//! Conversation, message and session types exchanged with the portal API.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::MessagingError;
use super::ids::{ConversationId, UserId};

/// Kind of conversation, which decides endpoint shape and payload fields.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    /// Group chat; messages carry `groupId`.
    Group,
    /// Discussion thread; messages carry `threadId`.
    Thread,
    /// One-to-one conversation.
    Private,
}

impl ConversationKind {
    /// Stable string form used on the wire and on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Thread => "thread",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for ConversationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversationKind {
    type Err = MessagingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "group" => Ok(Self::Group),
            "thread" => Ok(Self::Thread),
            "private" => Ok(Self::Private),
            other => Err(MessagingError::UnknownConversationKind(other.to_string())),
        }
    }
}

/// A conversation the user can read and post to.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Conversation {
    /// Conversation kind.
    pub kind: ConversationKind,
    /// Group, thread or peer identifier.
    pub id: ConversationId,
}

impl Conversation {
    /// Create a conversation reference.
    #[must_use]
    pub const fn new(kind: ConversationKind, id: ConversationId) -> Self {
        Self { kind, id }
    }

    /// Parse `kind` and `id` from raw strings.
    ///
    /// # Errors
    /// Returns an error if the kind is unknown or the id is invalid.
    pub fn parse(kind: &str, id: &str) -> Result<Self, MessagingError> {
        Ok(Self::new(kind.parse()?, ConversationId::new(id)?))
    }
}

impl fmt::Display for Conversation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A message as returned by the server.
///
/// Fields the client does not interpret are kept in `extra` so that a
/// message can be re-serialized without loss.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Server-assigned identifier.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Message text.
    pub body: String,
    /// Author identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    /// Owning group, for group messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Owning thread, for thread messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Any other fields sent by the server.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Kind-specific fields merged into an outgoing message.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraFields {
    /// Set for group conversations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Set for thread conversations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// Payload posted when sending a message.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    /// Message text.
    pub body: String,
    /// Author identifier taken from the session.
    pub sender_id: String,
    /// Kind-specific fields.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Body of a successful fetch: `{ "data": [Message, ...] }`.
#[derive(Clone, Debug, Deserialize)]
pub struct FetchEnvelope {
    /// Messages in server order.
    pub data: Vec<Message>,
}

/// Body of a successful send: `{ "data": { "message": Message } }`.
#[derive(Clone, Debug, Deserialize)]
pub struct SendEnvelope {
    /// Wrapped message.
    pub data: SentMessage,
}

/// Inner object of [`SendEnvelope`].
#[derive(Clone, Debug, Deserialize)]
pub struct SentMessage {
    /// The stored message as confirmed by the server.
    pub message: Message,
}

/// Identity of the signed-in user.
///
/// Accepts both `userId` and the backend's raw `_id` field.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// The user's identifier.
    #[serde(rename = "userId", alias = "_id")]
    pub user_id: UserId,
}

impl Session {
    /// Create a session for the given user.
    #[must_use]
    pub const fn new(user_id: UserId) -> Self {
        Self { user_id }
    }
}
