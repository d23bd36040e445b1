//! Per-user conversation registry.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::info;

use crate::chat::client::ConversationClient;
use crate::chat::completion::CompletionApi;
use crate::chat::message::Message;

/// A conversation shared between requests for the same user.
///
/// Holding the lock for a whole turn keeps at most one completion in flight
/// per user and appends in lock-acquisition (FIFO) order.
pub type SharedConversation = Arc<Mutex<ConversationClient>>;

/// Maps a user id to its conversation. Entries are never evicted.
pub struct SessionRegistry {
    sessions: DashMap<String, SharedConversation>,
    api: Arc<dyn CompletionApi>,
    model: String,
    persona: Option<String>,
}

impl SessionRegistry {
    /// Create an empty registry.
    ///
    /// New conversations talk to `api` with `model` and, when `persona` is
    /// set, start with it as a system message.
    #[must_use]
    pub fn new(
        api: Arc<dyn CompletionApi>,
        model: impl Into<String>,
        persona: Option<String>,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            api,
            model: model.into(),
            persona,
        }
    }

    /// Return the conversation for `user_id`, creating it on first contact.
    ///
    /// Lookup and insertion happen under the same shard lock, so concurrent
    /// first contacts for one user end up with a single conversation.
    pub fn get_or_create(&self, user_id: &str) -> SharedConversation {
        if let Some(existing) = self.sessions.get(user_id) {
            return Arc::clone(existing.value());
        }

        let entry = self
            .sessions
            .entry(user_id.to_owned())
            .or_insert_with(|| {
                info!(user_id, "Opening conversation");
                Arc::new(Mutex::new(self.new_conversation()))
            });
        Arc::clone(entry.value())
    }

    /// Conversation for `user_id`, if one exists.
    #[must_use]
    pub fn get(&self, user_id: &str) -> Option<SharedConversation> {
        self.sessions
            .get(user_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Drop the conversation for `user_id`.
    pub fn remove(&self, user_id: &str) -> Option<SharedConversation> {
        self.sessions.remove(user_id).map(|(_, conversation)| conversation)
    }

    /// Whether `user_id` has a conversation.
    #[must_use]
    pub fn contains(&self, user_id: &str) -> bool {
        self.sessions.contains_key(user_id)
    }

    /// Number of conversations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no conversation has been opened yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn new_conversation(&self) -> ConversationClient {
        let mut conversation = ConversationClient::new(self.model.clone(), Arc::clone(&self.api));
        if let Some(persona) = &self.persona {
            conversation.add_message(Message::system(persona.clone()));
        }
        conversation
    }
}
