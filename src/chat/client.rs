//! Per-conversation history and the completion call that consumes it.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::chat::completion::{Completion, CompletionApi, CompletionRequest};
use crate::chat::errors::{ChatError, ChatResult};
use crate::chat::message::Message;

/// Ordered history of one conversation bound to a model.
///
/// History grows without bound; nothing here truncates or summarizes it.
pub struct ConversationClient {
    model: String,
    messages: Vec<Message>,
    api: Arc<dyn CompletionApi>,
}

impl ConversationClient {
    /// Create an empty conversation for `model`.
    #[must_use]
    pub fn new(model: impl Into<String>, api: Arc<dyn CompletionApi>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            api,
        }
    }

    /// Model identifier sent with every completion.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// History, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages in the history.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append a message to the history.
    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Send the whole history to the completion API.
    ///
    /// History is not modified, whatever the outcome.
    ///
    /// # Errors
    /// Returns an error if the completion call fails or times out.
    pub async fn create(&self) -> ChatResult<Completion> {
        self.api
            .complete(CompletionRequest {
                model: &self.model,
                messages: &self.messages,
            })
            .await
    }

    /// Run one user turn: complete the history plus `text`, then record both.
    ///
    /// The user message and the reply are appended together once the reply
    /// is in hand. A failed or cancelled turn leaves the history as it was.
    ///
    /// # Errors
    /// Returns an error if the completion fails or carries no text.
    pub async fn converse(&mut self, text: impl Into<String>) -> ChatResult<String> {
        let mut pending = Vec::with_capacity(self.messages.len() + 2);
        pending.extend_from_slice(&self.messages);
        pending.push(Message::user(text));

        let outcome = self
            .api
            .complete(CompletionRequest {
                model: &self.model,
                messages: &pending,
            })
            .await
            .and_then(|completion| {
                completion
                    .first_content()
                    .map(str::to_owned)
                    .ok_or(ChatError::EmptyChoices)
            });

        match outcome {
            Ok(reply) => {
                pending.push(Message::assistant(reply.clone()));
                self.messages = pending;
                debug!(model = %self.model, history = self.messages.len(), "Turn recorded");
                Ok(reply)
            }
            Err(err) => {
                warn!(model = %self.model, "Turn discarded: {err}");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::message::Role;
    use crate::testing::StubCompletion;
    use std::time::Duration;

    fn client_with(stub: &Arc<StubCompletion>) -> ConversationClient {
        let api: Arc<dyn CompletionApi> = stub.clone();
        ConversationClient::new("gpt-3.5-turbo", api)
    }

    #[test]
    fn test_add_message_preserves_order() {
        let stub = Arc::new(StubCompletion::replying("ok"));
        let mut client = client_with(&stub);

        let contents = ["a", "b", "c", "d"];
        for content in contents {
            client.add_message(Message::user(content));
        }

        let seen: Vec<&str> = client.messages().iter().map(Message::content).collect();
        assert_eq!(seen, contents);
        assert_eq!(client.len(), 4);
    }

    #[tokio::test]
    async fn test_create_sends_full_history() {
        let stub = Arc::new(StubCompletion::replying("ok"));
        let mut client = client_with(&stub);
        client.add_message(Message::system("persona"));
        for i in 0..5 {
            client.add_message(Message::user(format!("u{i}")));
            client.add_message(Message::assistant(format!("a{i}")));
        }

        let completion = client.create().await;
        assert!(completion.is_ok());

        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].len(), client.len());
        assert_eq!(requests[0].as_slice(), client.messages());
    }

    #[tokio::test]
    async fn test_create_leaves_history_untouched() {
        let stub = Arc::new(StubCompletion::replying("ok"));
        let mut client = client_with(&stub);
        client.add_message(Message::user("hello"));

        let _ = client.create().await;
        assert_eq!(client.len(), 1);
    }

    #[tokio::test]
    async fn test_converse_records_both_turns() {
        let stub = Arc::new(StubCompletion::replying("hi there"));
        let mut client = client_with(&stub);

        let reply = client.converse("hello").await;

        assert_eq!(reply.ok().as_deref(), Some("hi there"));
        let roles: Vec<Role> = client.messages().iter().map(Message::role).collect();
        assert_eq!(roles, [Role::User, Role::Assistant]);
        assert_eq!(client.messages()[1].content(), "hi there");
    }

    #[tokio::test]
    async fn test_failed_turn_leaves_no_trace() {
        let stub = Arc::new(StubCompletion::timing_out());
        let mut client = client_with(&stub);
        client.add_message(Message::system("persona"));
        let before = client.messages().to_vec();

        let result = client.converse("hello").await;

        assert!(result.is_err_and(|err| err.is_timeout()));
        assert_eq!(client.messages(), before.as_slice());
        // The failed request still carried the user turn.
        assert_eq!(stub.requests()[0].len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_turn_leaves_no_trace() {
        let stub = Arc::new(StubCompletion::echoing(Duration::from_secs(5)));
        let mut client = client_with(&stub);
        client.add_message(Message::system("persona"));

        let cancelled =
            tokio::time::timeout(Duration::from_millis(50), client.converse("hello")).await;

        assert!(cancelled.is_err());
        assert_eq!(client.messages(), [Message::system("persona")]);
        assert_eq!(stub.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_choices_is_a_failure() {
        let stub = Arc::new(StubCompletion::empty());
        let mut client = client_with(&stub);

        let result = client.converse("hello").await;

        assert!(matches!(result, Err(ChatError::EmptyChoices)));
        assert!(client.is_empty());
    }

    #[tokio::test]
    async fn test_next_turn_includes_previous_reply() {
        let stub = Arc::new(StubCompletion::echoing(Duration::ZERO));
        let mut client = client_with(&stub);

        let _ = client.converse("one").await;
        let _ = client.converse("two").await;

        let requests = stub.requests();
        assert_eq!(requests[1].len(), 3);
        assert_eq!(requests[1][1], Message::assistant("re: one"));
    }
}
