//! Webhook payload model.
//!
//! Only the parts the relay acts on are typed; every other event or message
//! kind decodes to an `Other` variant and is ignored.

use serde::Deserialize;

/// Body of a webhook delivery.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    /// Bot user id the delivery is addressed to.
    #[serde(default)]
    pub destination: Option<String>,
    /// Events in delivery order.
    #[serde(default)]
    pub events: Vec<Event>,
}

impl WebhookPayload {
    /// Text messages the relay should answer, in delivery order.
    pub fn text_messages(&self) -> impl Iterator<Item = InboundText<'_>> {
        self.events.iter().filter_map(Event::as_inbound_text)
    }
}

/// A webhook event.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    /// A user sent a message.
    Message(MessageEvent),
    /// Follow, unfollow, postback and the rest.
    #[serde(other)]
    Other,
}

impl Event {
    /// View this event as an answerable text message.
    ///
    /// Returns `None` for non-message events, non-text messages, and events
    /// lacking a reply token or a user id.
    #[must_use]
    pub fn as_inbound_text(&self) -> Option<InboundText<'_>> {
        let Self::Message(event) = self else {
            return None;
        };
        let EventMessage::Text { text, .. } = &event.message else {
            return None;
        };

        Some(InboundText {
            user_id: event.source.as_ref()?.user_id()?,
            text,
            reply_token: event.reply_token.as_deref()?,
        })
    }
}

/// Payload of a `message` event.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    /// Token for the one reply allowed to this event.
    #[serde(default)]
    pub reply_token: Option<String>,
    /// Where the message came from.
    #[serde(default)]
    pub source: Option<Source>,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// The message itself.
    pub message: EventMessage,
}

/// Origin of an event.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Source {
    /// One-to-one chat.
    User {
        /// Sender.
        #[serde(rename = "userId")]
        user_id: String,
    },
    /// Group chat.
    Group {
        /// Group id.
        #[serde(rename = "groupId")]
        group_id: String,
        /// Sender, absent when the user has not consented to sharing it.
        #[serde(rename = "userId", default)]
        user_id: Option<String>,
    },
    /// Multi-person chat.
    Room {
        /// Room id.
        #[serde(rename = "roomId")]
        room_id: String,
        /// Sender, absent when the user has not consented to sharing it.
        #[serde(rename = "userId", default)]
        user_id: Option<String>,
    },
}

impl Source {
    /// Sending user, when known.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::User { user_id } => Some(user_id),
            Self::Group { user_id, .. } | Self::Room { user_id, .. } => user_id.as_deref(),
        }
    }
}

/// Content of a `message` event.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventMessage {
    /// Plain text.
    Text {
        /// Message id.
        id: String,
        /// Text as typed by the user.
        text: String,
    },
    /// Stickers, images, audio and the rest.
    #[serde(other)]
    Other,
}

/// A text message the relay answers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InboundText<'a> {
    /// Conversation key.
    pub user_id: &'a str,
    /// Text sent by the user.
    pub text: &'a str,
    /// Token for the reply.
    pub reply_token: &'a str,
}
