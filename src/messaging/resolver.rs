//! Maps a conversation to its endpoint and outgoing-message fields.
//!
//! | kind    | path                          | extra fields           |
//! |---------|-------------------------------|------------------------|
//! | group   | `/groups/{id}/messages`       | `groupId`              |
//! | thread  | `/threads/{id}/messages`      | `threadId`             |
//! | private | `/messages/{id}?type=private` | none                   |
//!
//! The same path serves both the fetch (GET) and the send (POST).

use super::ids::ConversationId;
use super::types::{Conversation, ConversationKind, ExtraFields};

/// Request path for reading and posting messages of a conversation.
#[must_use]
pub fn endpoint(kind: ConversationKind, id: &ConversationId) -> String {
    let segment = urlencoding::encode(id.as_str());
    match kind {
        ConversationKind::Group => format!("/groups/{segment}/messages"),
        ConversationKind::Thread => format!("/threads/{segment}/messages"),
        ConversationKind::Private => format!("/messages/{segment}?type=private"),
    }
}

/// Kind-specific fields merged into an outgoing message.
#[must_use]
pub fn message_props(kind: ConversationKind, id: &ConversationId) -> ExtraFields {
    match kind {
        ConversationKind::Group => ExtraFields {
            group_id: Some(id.to_string()),
            thread_id: None,
        },
        ConversationKind::Thread => ExtraFields {
            group_id: None,
            thread_id: Some(id.to_string()),
        },
        ConversationKind::Private => ExtraFields::default(),
    }
}

/// Endpoint and payload fields resolved for one conversation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Route {
    /// Path relative to the API base URL.
    pub path: String,
    /// Fields merged into outgoing messages.
    pub extra: ExtraFields,
}

/// Resolve both the path and the extra fields of a conversation.
#[must_use]
pub fn resolve(conversation: &Conversation) -> Route {
    Route {
        path: endpoint(conversation.kind, &conversation.id),
        extra: message_props(conversation.kind, &conversation.id),
    }
}
