//! Error types for the messaging module.

use thiserror::Error;

use super::ids::IdError;

/// Errors that can occur while loading or sending messages.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// HTTP request failed before a response was received.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP client configuration error.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// The server answered with a non-success status.
    #[error("server returned status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The response body did not match the expected envelope.
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    /// Conversation kind string outside `group`, `thread`, `private`.
    #[error("unknown conversation kind: {0}")]
    UnknownConversationKind(String),

    /// Conversation or user identifier failed validation.
    #[error("invalid identifier: {0}")]
    InvalidConversationId(#[from] IdError),

    /// Message body is empty after trimming.
    #[error("message body must not be empty")]
    EmptyBody,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MessagingError {
    /// Check if this error is worth retrying by the caller.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// HTTP status code if the server answered.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Convenience result alias for messaging operations.
pub type MessagingResult<T> = Result<T, MessagingError>;
