//! Webhook event dispatch: one conversation turn per inbound text message.

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::line::event::{InboundText, WebhookPayload};

use super::state::AppState;

/// How a single inbound message was answered.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TurnOutcome {
    /// Model reply was sent.
    Replied,
    /// Turn failed; the fallback reply was sent instead.
    Fallback,
    /// No reply could be delivered.
    ReplyFailed,
}

/// Answer every text message in `payload`.
///
/// Messages run concurrently; messages from the same user queue on that
/// user's conversation lock in delivery order. Outcomes are returned in
/// delivery order.
pub async fn dispatch(state: &AppState, payload: &WebhookPayload) -> Vec<TurnOutcome> {
    let turns: Vec<_> = payload
        .text_messages()
        .map(|inbound| handle_text(state, inbound))
        .collect();
    if turns.is_empty() {
        debug!(events = payload.events.len(), "No text messages to answer");
        return Vec::new();
    }

    let outcomes = join_all(turns).await;
    info!(
        turns = outcomes.len(),
        replied = outcomes.iter().filter(|o| **o == TurnOutcome::Replied).count(),
        "Webhook delivery handled"
    );
    outcomes
}

/// Run one turn for `inbound` and send the reply.
pub async fn handle_text(state: &AppState, inbound: InboundText<'_>) -> TurnOutcome {
    let conversation = state.registry.get_or_create(inbound.user_id);

    let result = {
        let mut conversation = conversation.lock().await;
        conversation.converse(inbound.text).await
    };

    let (reply, outcome) = match result {
        Ok(reply) if !reply.trim().is_empty() => (reply.trim().to_string(), TurnOutcome::Replied),
        Ok(_) => {
            warn!(user_id = inbound.user_id, "Completion was blank, sending fallback");
            (state.fallback_reply.clone(), TurnOutcome::Fallback)
        }
        Err(err) => {
            error!(user_id = inbound.user_id, "Completion failed: {err}");
            (state.fallback_reply.clone(), TurnOutcome::Fallback)
        }
    };

    if let Err(err) = state.replier.reply_text(inbound.reply_token, &reply).await {
        error!(user_id = inbound.user_id, "Reply failed: {err}");
        return TurnOutcome::ReplyFailed;
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::chat::message::Message;
    use crate::chat::registry::SessionRegistry;
    use crate::line::signature::SignatureVerifier;
    use crate::testing::{RecordingReplier, StubCompletion};

    const FALLBACK: &str = "unavailable";

    fn state_with(
        stub: &Arc<StubCompletion>,
        replier: &Arc<RecordingReplier>,
    ) -> Arc<AppState> {
        let registry = SessionRegistry::new(stub.clone(), "gpt-3.5-turbo", Some("persona".to_string()));
        AppState::new(
            registry,
            replier.clone(),
            SignatureVerifier::new("secret"),
            FALLBACK,
        )
    }

    fn inbound<'a>(user_id: &'a str, text: &'a str, reply_token: &'a str) -> InboundText<'a> {
        InboundText {
            user_id,
            text,
            reply_token,
        }
    }

    #[tokio::test]
    async fn test_new_user_turn_is_relayed_trimmed() {
        let stub = Arc::new(StubCompletion::replying("  hi there\n"));
        let replier = Arc::new(RecordingReplier::default());
        let state = state_with(&stub, &replier);

        let outcome = handle_text(&state, inbound("U1", "hello", "rt-1")).await;

        assert_eq!(outcome, TurnOutcome::Replied);
        assert_eq!(
            stub.requests(),
            [vec![Message::system("persona"), Message::user("hello")]]
        );
        assert_eq!(replier.sent(), [("rt-1".to_string(), "hi there".to_string())]);

        let conversation = state.registry.get_or_create("U1");
        assert_eq!(conversation.lock().await.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_turn_sends_fallback_and_keeps_history() {
        let stub = Arc::new(StubCompletion::timing_out());
        let replier = Arc::new(RecordingReplier::default());
        let state = state_with(&stub, &replier);

        let outcome = handle_text(&state, inbound("U1", "hello", "rt-1")).await;

        assert_eq!(outcome, TurnOutcome::Fallback);
        assert_eq!(replier.sent(), [("rt-1".to_string(), FALLBACK.to_string())]);
        let conversation = state.registry.get_or_create("U1");
        assert_eq!(
            conversation.lock().await.messages(),
            [Message::system("persona")]
        );
    }

    #[tokio::test]
    async fn test_blank_completion_sends_fallback() {
        let stub = Arc::new(StubCompletion::replying("   "));
        let replier = Arc::new(RecordingReplier::default());
        let state = state_with(&stub, &replier);

        let outcome = handle_text(&state, inbound("U1", "hello", "rt-1")).await;

        assert_eq!(outcome, TurnOutcome::Fallback);
        assert_eq!(replier.sent()[0].1, FALLBACK);
    }

    #[tokio::test]
    async fn test_reply_failure_is_reported() {
        let stub = Arc::new(StubCompletion::replying("hi"));
        let replier = Arc::new(RecordingReplier::failing());
        let state = state_with(&stub, &replier);

        let outcome = handle_text(&state, inbound("U1", "hello", "rt-1")).await;

        assert_eq!(outcome, TurnOutcome::ReplyFailed);
        // The turn itself succeeded, so it stays in the history.
        let conversation = state.registry.get_or_create("U1");
        assert_eq!(conversation.lock().await.len(), 3);
    }

    #[tokio::test]
    async fn test_dispatch_keeps_same_user_order() -> Result<(), serde_json::Error> {
        let stub = Arc::new(StubCompletion::echoing(Duration::from_millis(10)));
        let replier = Arc::new(RecordingReplier::default());
        let state = state_with(&stub, &replier);

        let payload: WebhookPayload = serde_json::from_value(serde_json::json!({
            "destination": "Ubot",
            "events": [
                {"type": "message", "replyToken": "rt-1", "source": {"type": "user", "userId": "U1"},
                 "message": {"id": "1", "type": "text", "text": "first"}},
                {"type": "message", "replyToken": "rt-2", "source": {"type": "user", "userId": "U2"},
                 "message": {"id": "2", "type": "text", "text": "other"}},
                {"type": "message", "replyToken": "rt-3", "source": {"type": "user", "userId": "U1"},
                 "message": {"id": "3", "type": "text", "text": "second"}}
            ]
        }))?;

        let outcomes = dispatch(&state, &payload).await;

        assert_eq!(outcomes, [TurnOutcome::Replied; 3]);
        assert_eq!(state.registry.len(), 2);

        let conversation = state.registry.get_or_create("U1");
        let conversation = conversation.lock().await;
        let texts: Vec<&str> = conversation.messages().iter().map(Message::content).collect();
        assert_eq!(texts, ["persona", "first", "re: first", "second", "re: second"]);
        Ok(())
    }
}
