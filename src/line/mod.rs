//! LINE Messaging API boundary.
//!
//! - `signature`: `X-Line-Signature` verification
//! - `event`: webhook payload decoding
//! - `messaging`: reply delivery
//! - `errors`: boundary error type

pub mod errors;
pub mod event;
pub mod messaging;
pub mod signature;

pub use errors::{LineError, LineResult};
pub use event::{Event, EventMessage, InboundText, MessageEvent, Source, WebhookPayload};
pub use messaging::{LineMessagingClient, ReplyFuture, ReplySender};
pub use signature::{SIGNATURE_HEADER, SignatureVerifier};
