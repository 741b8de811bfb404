//! Configuration for the messaging client.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::error::{MessagingError, MessagingResult};

/// Environment variable holding the API base URL.
pub const API_URL_ENV: &str = "STUDENT_HUB_API_URL";
/// Environment variable holding the bearer token.
pub const TOKEN_ENV: &str = "STUDENT_HUB_TOKEN";
/// Environment variable overriding the request timeout, in seconds.
pub const TIMEOUT_ENV: &str = "STUDENT_HUB_TIMEOUT_SECS";

/// Default API base URL (local development backend).
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000/api";

/// Configuration for the HTTP transport.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL every request path is appended to.
    pub base_url: String,
    /// Request timeout.
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
    /// Connection timeout.
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
    /// Bearer token sent in the `Authorization` header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            auth_token: None,
            user_agent: format!("student-hub/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Create a new config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from the process environment over the defaults.
    ///
    /// # Errors
    /// Returns an error if a variable is set to an unusable value.
    pub fn from_env() -> MessagingResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup over the defaults.
    ///
    /// # Errors
    /// Returns an error if a value cannot be parsed or the result is invalid.
    pub fn from_lookup<F>(lookup: F) -> MessagingResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            config.base_url = url.trim().to_string();
        }

        if let Some(token) = lookup(TOKEN_ENV).filter(|v| !v.trim().is_empty()) {
            config.auth_token = Some(token.trim().to_string());
        }

        if let Some(raw) = lookup(TIMEOUT_ENV) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                MessagingError::Config(format!("{TIMEOUT_ENV} must be a whole number of seconds"))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the bearer token.
    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if the base URL is not an absolute http(s) URL or a
    /// timeout is zero.
    pub fn validate(&self) -> MessagingResult<()> {
        let url = Url::parse(&self.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(MessagingError::Config(format!(
                "base_url must use http or https, got {}",
                url.scheme()
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(MessagingError::Config(
                "request_timeout must be > 0".to_string(),
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(MessagingError::Config(
                "connect_timeout must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Serde module for Duration serialization.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
