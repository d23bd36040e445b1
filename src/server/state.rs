//! Application state shared across all request handlers.

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};

use crate::chat::completion::{CompletionApi, OpenAiCompletionClient};
use crate::chat::registry::SessionRegistry;
use crate::config::RelayConfig;
use crate::line::messaging::{LineMessagingClient, ReplySender};
use crate::line::signature::SignatureVerifier;

/// Shared application state.
pub struct AppState {
    /// Per-user conversations.
    pub registry: SessionRegistry,
    /// Reply channel back to LINE.
    pub replier: Arc<dyn ReplySender>,
    /// Webhook signature check.
    pub verifier: SignatureVerifier,
    /// Text sent when a turn fails.
    pub fallback_reply: String,
    /// When the state was built.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Assemble state from already-built parts.
    #[must_use]
    pub fn new(
        registry: SessionRegistry,
        replier: Arc<dyn ReplySender>,
        verifier: SignatureVerifier,
        fallback_reply: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            replier,
            verifier,
            fallback_reply: fallback_reply.into(),
            started_at: Utc::now(),
        })
    }

    /// Build the production state: OpenAI completions and LINE replies.
    ///
    /// # Errors
    /// Returns an error if either HTTP client cannot be created.
    pub fn from_config(config: &RelayConfig) -> anyhow::Result<Arc<Self>> {
        let completion = OpenAiCompletionClient::new(
            config.completion.api_key.clone(),
            &config.completion.base_url,
            config.completion.timeout,
        )
        .context("Failed to create completion client")?;
        let api: Arc<dyn CompletionApi> = Arc::new(completion);

        let replier = LineMessagingClient::new(
            config.line.channel_access_token.clone(),
            &config.line.api_base_url,
        )
        .context("Failed to create LINE messaging client")?;

        let registry = SessionRegistry::new(
            api,
            config.completion.model.clone(),
            config.session.persona.clone(),
        );

        Ok(Self::new(
            registry,
            Arc::new(replier),
            SignatureVerifier::new(config.line.channel_secret.clone()),
            config.server.fallback_reply.clone(),
        ))
    }
}
