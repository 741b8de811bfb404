//! Conversation messaging for the student hub portal.
//!
//! This module provides:
//! - Conversation kinds and their endpoint mapping (`resolver`)
//! - A `reqwest` transport for the portal REST API (`transport`)
//! - An ordered in-memory message store (`store`)
//! - A feed that loads and sends messages and drops stale responses (`feed`)

pub mod config;
pub mod error;
pub mod feed;
pub mod ids;
pub mod resolver;
pub mod store;
pub mod transport;
pub mod types;

pub use config::ClientConfig;
pub use error::{MessagingError, MessagingResult};
pub use feed::{LoadOutcome, MessageFeed, SendOutcome};
pub use ids::{ConversationId, IdError, RequestId, UserId};
pub use resolver::Route;
pub use store::MessageStore;
pub use transport::{HttpTransport, Transport, TransportFuture};
pub use types::{Conversation, ConversationKind, ExtraFields, Message, OutgoingMessage, Session};

use std::sync::Arc;

/// Build a feed for `conversation` backed by an [`HttpTransport`].
///
/// # Errors
/// Returns an error if the configuration is invalid or the HTTP client
/// cannot be created.
pub fn connect(config: &ClientConfig, conversation: Conversation) -> MessagingResult<MessageFeed> {
    let http = HttpTransport::new(config)?;
    tracing::debug!(base_url = http.base_url(), %conversation, "connecting message feed");

    let transport: Arc<dyn Transport> = Arc::new(http);
    Ok(MessageFeed::new(transport, conversation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_with_defaults() {
        let conversation = Conversation::parse("group", "g1");
        let feed = conversation.and_then(|c| connect(&ClientConfig::default(), c));
        assert!(feed.is_ok());
    }

    #[test]
    fn test_connect_rejects_bad_config() {
        let config = ClientConfig::new().with_base_url("mailto:someone@example.edu");
        let conversation = Conversation::parse("private", "u1");
        let feed = conversation.and_then(|c| connect(&config, c));
        assert!(matches!(feed, Err(MessagingError::Config(_))));
    }
}
