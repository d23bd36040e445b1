//! Chat-completion API abstraction and the OpenAI-compatible HTTP client.
//!
//! The wire format is the `chat/completions` shape: the request carries the
//! model identifier and the ordered message list, the response carries a list
//! of choices of which only the first is used.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::chat::errors::{ChatError, ChatResult};
use crate::chat::message::{Message, Role};

/// Default OpenAI API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Upper bound on establishing the TCP/TLS connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Boxed future type for completion operations.
pub type CompletionFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait abstraction over a remote completion service.
pub trait CompletionApi: Send + Sync {
    /// Send the full message list and return the raw completion.
    ///
    /// # Errors
    /// Returns an error if the request fails, times out, or the API rejects it.
    fn complete<'a>(
        &'a self,
        request: CompletionRequest<'a>,
    ) -> CompletionFuture<'a, ChatResult<Completion>>;
}

/// Completion request body.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct CompletionRequest<'a> {
    /// Model identifier.
    pub model: &'a str,
    /// Whole conversation, oldest first.
    pub messages: &'a [Message],
}

/// Raw completion result.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Completion {
    /// Provider-assigned completion id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Model that produced the completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Generated alternatives.
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// Token accounting, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl Completion {
    /// Build a completion holding a single assistant choice.
    #[must_use]
    pub fn from_text(content: impl Into<String>) -> Self {
        Self {
            choices: vec![Choice {
                index: 0,
                message: ChoiceMessage {
                    role: Role::Assistant,
                    content: Some(content.into()),
                },
                finish_reason: Some("stop".to_string()),
            }],
            ..Self::default()
        }
    }

    /// Text of the first choice, if any.
    #[must_use]
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }
}

/// One generated alternative.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Choice {
    /// Position in the choice list.
    #[serde(default)]
    pub index: u32,
    /// Generated message.
    pub message: ChoiceMessage,
    /// Why generation stopped.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Message inside a choice. `content` is null for tool-call responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChoiceMessage {
    /// Author role, normally `assistant`.
    pub role: Role,
    /// Generated text.
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage reported by the API.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the request.
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Tokens generated.
    #[serde(default)]
    pub completion_tokens: u64,
    /// Sum of both.
    #[serde(default)]
    pub total_tokens: u64,
}

/// Async client for an OpenAI-compatible `chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiCompletionClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    timeout: Duration,
}

impl OpenAiCompletionClient {
    /// Create a client for `base_url` (e.g. `https://api.openai.com/v1`).
    ///
    /// `timeout` bounds each completion call end to end.
    ///
    /// # Errors
    /// Returns an error if the endpoint URL is invalid or the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, base_url: &str, timeout: Duration) -> ChatResult<Self> {
        let endpoint = Url::parse(&format!(
            "{}/chat/completions",
            base_url.trim_end_matches('/')
        ))?;
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
            timeout,
        })
    }

    /// Endpoint requests are posted to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn post(&self, request: CompletionRequest<'_>) -> ChatResult<Completion> {
        debug!(
            model = request.model,
            messages = request.messages.len(),
            "Posting completion request"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| self.classify(err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Completion>()
            .await
            .map_err(|err| self.classify(err))
    }

    fn classify(&self, err: reqwest::Error) -> ChatError {
        if err.is_timeout() {
            ChatError::Timeout(self.timeout)
        } else {
            ChatError::Http(err)
        }
    }
}

impl CompletionApi for OpenAiCompletionClient {
    fn complete<'a>(
        &'a self,
        request: CompletionRequest<'a>,
    ) -> CompletionFuture<'a, ChatResult<Completion>> {
        Box::pin(async move {
            tokio::time::timeout(self.timeout, self.post(request))
                .await
                .unwrap_or(Err(ChatError::Timeout(self.timeout)))
        })
    }
}
