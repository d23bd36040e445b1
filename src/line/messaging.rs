//! Reply side of the Messaging API.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::line::errors::{LineError, LineResult};

/// Default Messaging API root.
pub const DEFAULT_API_BASE_URL: &str = "https://api.line.me";

/// Longest text a single LINE text message may carry, in characters.
pub const MAX_TEXT_CHARS: usize = 5_000;

/// HTTP I/O timeouts.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Boxed future type for reply operations.
pub type ReplyFuture<'a> = Pin<Box<dyn Future<Output = LineResult<()>> + Send + 'a>>;

/// Sends a text reply through a reply token.
pub trait ReplySender: Send + Sync {
    /// Reply to the event identified by `reply_token` with `text`.
    ///
    /// # Errors
    /// Returns an error if the reply could not be delivered.
    fn reply_text<'a>(&'a self, reply_token: &'a str, text: &'a str) -> ReplyFuture<'a>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: [TextMessage<'a>; 1],
}

#[derive(Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

/// Messaging API client authenticated with the channel access token.
#[derive(Clone)]
pub struct LineMessagingClient {
    client: Client,
    reply_endpoint: Url,
    access_token: String,
}

impl LineMessagingClient {
    /// Create a client for `base_url` (normally [`DEFAULT_API_BASE_URL`]).
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(access_token: impl Into<String>, base_url: &str) -> LineResult<Self> {
        let reply_endpoint = Url::parse(&format!(
            "{}/v2/bot/message/reply",
            base_url.trim_end_matches('/')
        ))?;
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            reply_endpoint,
            access_token: access_token.into(),
        })
    }

    async fn post_reply(&self, reply_token: &str, text: &str) -> LineResult<()> {
        let body = ReplyRequest {
            reply_token,
            messages: [TextMessage {
                kind: "text",
                text: clamp_text(text),
            }],
        };

        let response = self
            .client
            .post(self.reply_endpoint.clone())
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LineError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(chars = text.chars().count(), "Reply delivered");
        Ok(())
    }
}

impl ReplySender for LineMessagingClient {
    fn reply_text<'a>(&'a self, reply_token: &'a str, text: &'a str) -> ReplyFuture<'a> {
        Box::pin(self.post_reply(reply_token, text))
    }
}

/// Cut `text` to [`MAX_TEXT_CHARS`] characters.
#[must_use]
pub fn clamp_text(text: &str) -> &str {
    match text.char_indices().nth(MAX_TEXT_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
