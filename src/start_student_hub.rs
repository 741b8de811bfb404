//! Startup helpers for the `student-hub-messages` command.
//!
//! Usage: `student-hub-messages <group|thread|private> <id> [message...]`
//!
//! Loads the conversation, optionally sends `message` as the user named by
//! `STUDENT_HUB_USER_ID`, then prints the conversation.

use std::process::ExitCode;

use anyhow::Context;

use crate::messaging::{self, ClientConfig, Conversation, Message, SendOutcome, Session, UserId};

/// Environment variable naming the sending user.
pub const USER_ID_ENV: &str = "STUDENT_HUB_USER_ID";

/// Exit code for malformed command lines.
const USAGE_EXIT: u8 = 2;

/// Parsed command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    /// Conversation to open.
    pub conversation: Conversation,
    /// Message to send after loading, if any.
    pub message: Option<String>,
}

impl Invocation {
    /// Parse arguments (without the program name).
    ///
    /// # Errors
    /// Returns a usage message if the kind or id is missing or invalid.
    pub fn parse<I>(args: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let (Some(kind), Some(id)) = (args.next(), args.next()) else {
            return Err(usage());
        };

        let conversation =
            Conversation::parse(&kind, &id).map_err(|e| format!("{e}\n{}", usage()))?;

        let rest: Vec<String> = args.collect();
        let message = if rest.is_empty() {
            None
        } else {
            Some(rest.join(" "))
        };

        Ok(Self {
            conversation,
            message,
        })
    }
}

fn usage() -> String {
    "usage: student-hub-messages <group|thread|private> <id> [message...]".to_string()
}

/// Run the command with the process arguments and environment.
///
/// # Returns
/// `ExitCode::SUCCESS` on success, `1` on failure, `2` on usage errors.
#[must_use]
#[allow(clippy::print_stdout, clippy::print_stderr)]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let invocation = match Invocation::parse(std::env::args().skip(1)) {
        Ok(invocation) => invocation,
        Err(usage) => {
            eprintln!("{usage}");
            return ExitCode::from(USAGE_EXIT);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    match rt.block_on(execute(invocation)) {
        Ok(messages) => {
            for message in &messages {
                println!("{}", render(message));
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

/// Load the conversation, send the optional message, and return the store.
///
/// # Errors
/// Returns an error if configuration, loading or sending fails.
pub async fn execute(invocation: Invocation) -> anyhow::Result<Vec<Message>> {
    let config = ClientConfig::from_env().context("invalid client configuration")?;
    tracing::info!(
        "Opening {} against {}",
        invocation.conversation,
        config.base_url
    );

    let feed = messaging::connect(&config, invocation.conversation)?;
    feed.load().await.context("failed to load messages")?;

    if let Some(body) = invocation.message {
        let session = session_from_env()?;
        match feed.send(&session, &body).await.context("failed to send message")? {
            SendOutcome::Appended(message) | SendOutcome::Superseded(message) => {
                tracing::info!("Sent message {}", message.id.as_deref().unwrap_or("?"));
            }
        }
    }

    Ok(feed.messages().await)
}

fn session_from_env() -> anyhow::Result<Session> {
    let raw = std::env::var(USER_ID_ENV)
        .with_context(|| format!("{USER_ID_ENV} must be set to send messages"))?;
    let user_id = UserId::new(raw).with_context(|| format!("invalid {USER_ID_ENV}"))?;
    Ok(Session::new(user_id))
}

/// One-line rendering of a message for the terminal.
#[must_use]
pub fn render(message: &Message) -> String {
    let when = message
        .created_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    let sender = message.sender_id.as_deref().unwrap_or("unknown");
    format!("[{when}] {sender}: {}", message.body)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::messaging::ConversationKind;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_parse_load_only() {
        let invocation = Invocation::parse(args(&["group", "g1"]));
        let invocation = invocation.ok();
        assert_eq!(
            invocation.as_ref().map(|i| i.conversation.kind),
            Some(ConversationKind::Group)
        );
        assert_eq!(invocation.and_then(|i| i.message), None);
    }

    #[test]
    fn test_parse_joins_message_words() {
        let invocation = Invocation::parse(args(&["private", "u1", "see", "you", "soon"]));
        assert_eq!(
            invocation.ok().and_then(|i| i.message),
            Some("see you soon".to_string())
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Invocation::parse(args(&["group"])).is_err());
        assert!(Invocation::parse(args(&["channel", "c1"])).is_err());
        assert!(Invocation::parse(args(&["thread", "a/b"])).is_err());
    }

    #[test]
    fn test_render() {
        let message = Message {
            id: None,
            body: "hello".to_string(),
            sender_id: Some("u1".to_string()),
            group_id: None,
            thread_id: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).single(),
            extra: serde_json::Map::new(),
        };
        assert_eq!(render(&message), "[2024-03-01 09:30] u1: hello");
    }
}
