//! Message feed: loads and sends messages of one conversation.
//!
//! A feed is bound to a [`ConversationKind`] for its whole lifetime; the
//! conversation id can be switched. Every switch bumps a generation
//! counter. Loads and sends capture the generation before issuing their
//! request and only touch the store if it is still current when the
//! response arrives, so a slow response for a previous conversation can
//! never overwrite the messages of the current one.
//!
//! Within one conversation, each load takes a ticket when it starts and each
//! confirmed send takes one when it is appended. A load only replaces the
//! store if no later ticket has changed it already.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::error::{MessagingError, MessagingResult};
use super::ids::{ConversationId, RequestId};
use super::resolver;
use super::store::MessageStore;
use super::transport::Transport;
use super::types::{
    Conversation, ConversationKind, FetchEnvelope, Message, OutgoingMessage, SendEnvelope, Session,
};

/// Result of a successful load.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoadOutcome {
    /// The store now holds exactly the fetched messages.
    Replaced {
        /// Number of messages loaded.
        count: usize,
    },
    /// The conversation changed, or a load or send that started later
    /// already updated the store, while the request was in flight; the
    /// response was discarded.
    Superseded,
}

/// Result of a successful send.
#[derive(Clone, Debug, PartialEq)]
pub enum SendOutcome {
    /// The confirmed message was appended to the store.
    Appended(Message),
    /// The server stored the message but the conversation changed in the
    /// meantime, so the store was left alone.
    Superseded(Message),
}

impl SendOutcome {
    /// The message confirmed by the server.
    #[must_use]
    pub const fn message(&self) -> &Message {
        match self {
            Self::Appended(message) | Self::Superseded(message) => message,
        }
    }
}

struct FeedState {
    conversation: Conversation,
    generation: u64,
    /// Last ticket handed out.
    ticket: u64,
    /// Ticket of the load or send that last changed the store.
    applied: u64,
    store: MessageStore,
}

impl FeedState {
    const fn next_ticket(&mut self) -> u64 {
        self.ticket += 1;
        self.ticket
    }
}

/// Loads and sends messages for the selected conversation.
pub struct MessageFeed {
    transport: Arc<dyn Transport>,
    kind: ConversationKind,
    state: RwLock<FeedState>,
}

impl MessageFeed {
    /// Create a feed for `conversation` with an empty store.
    ///
    /// Nothing is fetched until [`MessageFeed::load`] is called.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, conversation: Conversation) -> Self {
        Self {
            transport,
            kind: conversation.kind,
            state: RwLock::new(FeedState {
                conversation,
                generation: 0,
                ticket: 0,
                applied: 0,
                store: MessageStore::new(),
            }),
        }
    }

    /// Kind this feed is bound to.
    #[must_use]
    pub const fn kind(&self) -> ConversationKind {
        self.kind
    }

    /// Currently selected conversation.
    pub async fn conversation(&self) -> Conversation {
        self.state.read().await.conversation.clone()
    }

    /// Snapshot of the stored messages in arrival order.
    pub async fn messages(&self) -> Vec<Message> {
        self.state.read().await.store.messages().to_vec()
    }

    /// Current generation; increases on every conversation switch.
    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }

    /// Select another conversation id of the same kind.
    ///
    /// Returns `false` without touching anything if `id` is already
    /// selected. Otherwise the store is cleared and in-flight requests
    /// become stale.
    pub async fn select(&self, id: ConversationId) -> bool {
        let mut state = self.state.write().await;
        if state.conversation.id == id {
            return false;
        }

        state.conversation = Conversation::new(self.kind, id);
        state.generation += 1;
        state.store.clear();
        debug!(
            conversation = %state.conversation,
            generation = state.generation,
            "conversation switched"
        );
        true
    }

    /// Select `id` and load it if it differs from the current conversation.
    ///
    /// Returns `Ok(None)` when `id` was already selected.
    ///
    /// # Errors
    /// Returns the load error; the (cleared) store is left unchanged.
    pub async fn switch_to(&self, id: ConversationId) -> MessagingResult<Option<LoadOutcome>> {
        if !self.select(id).await {
            return Ok(None);
        }
        self.load().await.map(Some)
    }

    /// Fetch the conversation's messages and replace the store with them.
    ///
    /// The response is discarded with [`LoadOutcome::Superseded`] if the
    /// conversation was switched, or if a load started later or a send
    /// confirmed later has already updated the store.
    ///
    /// # Errors
    /// Returns an error on network failure, non-success status, or a
    /// payload without a `data` array. The store is unchanged in that case.
    pub async fn load(&self) -> MessagingResult<LoadOutcome> {
        let (conversation, generation, ticket) = self.begin_load().await;
        let request_id = RequestId::new();
        let path = resolver::endpoint(conversation.kind, &conversation.id);
        debug!(%request_id, %conversation, %path, ticket, "loading messages");

        let messages = match self.fetch(&path).await {
            Ok(messages) => messages,
            Err(err) => {
                warn!(
                    %request_id,
                    %conversation,
                    error = %err,
                    retryable = err.is_retryable(),
                    "failed to load messages"
                );
                return Err(err);
            }
        };

        let mut state = self.state.write().await;
        if state.generation != generation {
            warn!(%request_id, %conversation, "discarding stale message list");
            return Ok(LoadOutcome::Superseded);
        }
        if ticket < state.applied {
            debug!(
                %request_id,
                %conversation,
                ticket,
                applied = state.applied,
                "discarding message list older than the store"
            );
            return Ok(LoadOutcome::Superseded);
        }

        let count = messages.len();
        state.applied = ticket;
        state.store.replace(messages);
        debug!(%request_id, %conversation, count, "messages loaded");
        Ok(LoadOutcome::Replaced { count })
    }

    /// Post a message as `session`'s user and append the confirmed copy.
    ///
    /// Nothing is appended before the server confirms the message.
    ///
    /// # Errors
    /// Returns [`MessagingError::EmptyBody`] for a blank body, or the
    /// transport/payload error. The store is unchanged in every error case.
    pub async fn send(&self, session: &Session, body: &str) -> MessagingResult<SendOutcome> {
        if body.trim().is_empty() {
            return Err(MessagingError::EmptyBody);
        }

        let (conversation, generation) = self.snapshot().await;
        let request_id = RequestId::new();
        let route = resolver::resolve(&conversation);
        let outgoing = OutgoingMessage {
            body: body.to_string(),
            sender_id: session.user_id.to_string(),
            extra: route.extra,
        };
        debug!(%request_id, %conversation, path = %route.path, "sending message");

        let message = match self.post(&route.path, &outgoing).await {
            Ok(message) => message,
            Err(err) => {
                warn!(
                    %request_id,
                    %conversation,
                    error = %err,
                    retryable = err.is_retryable(),
                    "failed to send message"
                );
                return Err(err);
            }
        };

        let mut state = self.state.write().await;
        if state.generation != generation {
            warn!(%request_id, %conversation, "sent message belongs to a previous conversation");
            return Ok(SendOutcome::Superseded(message));
        }

        let ticket = state.next_ticket();
        state.applied = ticket;
        state.store.append(message.clone());
        debug!(%request_id, %conversation, total = state.store.len(), "message appended");
        Ok(SendOutcome::Appended(message))
    }

    async fn snapshot(&self) -> (Conversation, u64) {
        let state = self.state.read().await;
        (state.conversation.clone(), state.generation)
    }

    async fn begin_load(&self) -> (Conversation, u64, u64) {
        let mut state = self.state.write().await;
        let ticket = state.next_ticket();
        (state.conversation.clone(), state.generation, ticket)
    }

    async fn fetch(&self, path: &str) -> MessagingResult<Vec<Message>> {
        let value = self.transport.get_json(path).await?;
        let envelope: FetchEnvelope = serde_json::from_value(value)?;
        Ok(envelope.data)
    }

    async fn post(&self, path: &str, outgoing: &OutgoingMessage) -> MessagingResult<Message> {
        let body = serde_json::to_value(outgoing)?;
        let value = self.transport.post_json(path, body).await?;
        let envelope: SendEnvelope = serde_json::from_value(value)?;
        Ok(envelope.data.message)
    }
}
