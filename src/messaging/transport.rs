//! HTTP transport for the portal REST API.
//!
//! The [`Transport`] trait is the seam between the message feed and the
//! network; [`HttpTransport`] is the `reqwest` implementation.

use futures::future::BoxFuture;
use serde_json::Value;
use url::Url;

use super::config::ClientConfig;
use super::error::{MessagingError, MessagingResult};

/// Boxed future type for transport operations.
pub type TransportFuture<'a, T> = BoxFuture<'a, MessagingResult<T>>;

/// Longest error body kept in [`MessagingError::HttpStatus`].
const MAX_ERROR_BODY_CHARS: usize = 512;

/// JSON request/response transport relative to a base URL.
pub trait Transport: Send + Sync {
    /// GET `path` and return the decoded JSON body.
    fn get_json<'a>(&'a self, path: &'a str) -> TransportFuture<'a, Value>;

    /// POST `body` to `path` and return the decoded JSON body.
    fn post_json<'a>(&'a self, path: &'a str, body: Value) -> TransportFuture<'a, Value>;
}

/// `reqwest`-backed transport.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport for the given configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn new(config: &ClientConfig) -> MessagingResult<Self> {
        config.validate()?;
        let client = Self::build_client(config)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL requests are issued against, without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an HTTP client with JSON and auth headers.
    fn build_client(config: &ClientConfig) -> MessagingResult<reqwest::Client> {
        use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let ua = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| MessagingError::Config(format!("invalid user agent: {e}")))?;
        headers.insert(USER_AGENT, ua);

        if let Some(token) = &config.auth_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| MessagingError::Config(format!("invalid auth token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| MessagingError::HttpClient(e.to_string()))
    }

    /// Absolute URL for a path such as `/messages/u1?type=private`.
    fn url(&self, path: &str) -> MessagingResult<Url> {
        Ok(Url::parse(&format!("{}{path}", self.base_url))?)
    }
}

impl Transport for HttpTransport {
    fn get_json<'a>(&'a self, path: &'a str) -> TransportFuture<'a, Value> {
        Box::pin(async move {
            let url = self.url(path)?;
            let response = self.client.get(url).send().await?;
            read_json(response).await
        })
    }

    fn post_json<'a>(&'a self, path: &'a str, body: Value) -> TransportFuture<'a, Value> {
        Box::pin(async move {
            let url = self.url(path)?;
            let response = self.client.post(url).json(&body).send().await?;
            read_json(response).await
        })
    }
}

/// Turn a response into JSON, mapping non-2xx statuses to errors.
async fn read_json(response: reqwest::Response) -> MessagingResult<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(MessagingError::HttpStatus {
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        });
    }

    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::panic)]
mod tests {
    use std::collections::HashMap;

    use axum::extract::{Path, Query};
    use axum::http::header::AUTHORIZATION;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;
    use crate::messaging::ids::{ConversationId, IdError};
    use crate::messaging::resolver;
    use crate::messaging::types::ConversationKind;

    async fn list_group(Path(id): Path<String>) -> Json<Value> {
        Json(json!({
            "status": "success",
            "data": [
                { "_id": "m1", "body": "first", "groupId": id },
                { "_id": "m2", "body": "second", "groupId": id }
            ]
        }))
    }

    async fn create_group_message(
        Path(id): Path<String>,
        Json(mut body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        body["_id"] = json!(format!("{id}-new"));
        (StatusCode::CREATED, Json(json!({ "data": { "message": body } })))
    }

    async fn list_private(
        Path(id): Path<String>,
        Query(params): Query<HashMap<String, String>>,
        headers: HeaderMap,
    ) -> Json<Value> {
        let auth = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Json(json!({ "peer": id, "type": params.get("type"), "auth": auth }))
    }

    async fn spawn_backend() -> String {
        let app = Router::new()
            .route(
                "/api/groups/{id}/messages",
                get(list_group).post(create_group_message),
            )
            .route("/api/messages/{id}", get(list_private))
            .route(
                "/api/broken",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .route("/api/garbled", get(|| async { "not json" }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        format!("http://{addr}/api")
    }

    async fn transport(token: Option<&str>) -> HttpTransport {
        let mut config = ClientConfig::new().with_base_url(format!("{}/", spawn_backend().await));
        if let Some(token) = token {
            config = config.with_auth_token(token);
        }
        HttpTransport::new(&config).expect("transport builds")
    }

    #[test]
    fn test_url_join_keeps_base_path() {
        let config = ClientConfig::new().with_base_url("https://portal.example.edu/api/");
        let transport = HttpTransport::new(&config).expect("transport builds");

        assert_eq!(transport.base_url(), "https://portal.example.edu/api");
        let url = transport
            .url("/messages/u1?type=private")
            .expect("url parses");
        assert_eq!(
            url.as_str(),
            "https://portal.example.edu/api/messages/u1?type=private"
        );
    }

    #[test]
    fn test_dotted_ids_stay_inside_their_endpoint() {
        let config = ClientConfig::new().with_base_url("https://portal.example.edu/api");
        let transport = HttpTransport::new(&config).expect("transport builds");

        // A bare dot segment would resolve to `/api/messages`.
        assert_eq!(ConversationId::new(".."), Err(IdError::DotSegment));

        let id = ConversationId::new("..x").expect("valid id");
        let group = transport
            .url(&resolver::endpoint(ConversationKind::Group, &id))
            .expect("url parses");
        assert_eq!(
            group.as_str(),
            "https://portal.example.edu/api/groups/..x/messages"
        );

        let private = transport
            .url(&resolver::endpoint(ConversationKind::Private, &id))
            .expect("url parses");
        assert_eq!(
            private.as_str(),
            "https://portal.example.edu/api/messages/..x?type=private"
        );
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = ClientConfig::new().with_base_url("nowhere");
        assert!(HttpTransport::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_get_json() {
        let transport = transport(None).await;
        let value = transport
            .get_json("/groups/g1/messages")
            .await
            .expect("get succeeds");

        assert_eq!(value["data"][0]["_id"], "m1");
        assert_eq!(value["data"][1]["groupId"], "g1");
    }

    #[tokio::test]
    async fn test_post_json() {
        let transport = transport(None).await;
        let value = transport
            .post_json(
                "/groups/g1/messages",
                json!({ "body": "hey", "senderId": "u1", "groupId": "g1" }),
            )
            .await
            .expect("post succeeds");

        assert_eq!(value["data"]["message"]["_id"], "g1-new");
        assert_eq!(value["data"]["message"]["body"], "hey");
    }

    #[tokio::test]
    async fn test_query_and_bearer_token() {
        let transport = transport(Some("tok")).await;
        let value = transport
            .get_json("/messages/u1?type=private")
            .await
            .expect("get succeeds");

        assert_eq!(value["peer"], "u1");
        assert_eq!(value["type"], "private");
        assert_eq!(value["auth"], "Bearer tok");
    }

    #[tokio::test]
    async fn test_error_status() {
        let transport = transport(None).await;
        let err = transport.get_json("/broken").await;

        match err {
            Err(MessagingError::HttpStatus { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let transport = transport(None).await;
        let err = transport.get_json("/garbled").await;
        assert!(matches!(err, Err(MessagingError::MalformedPayload(_))));
    }
}
