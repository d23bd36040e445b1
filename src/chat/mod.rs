//! Conversation core.
//!
//! - `message`: roles and immutable turns
//! - `completion`: completion API trait and the OpenAI-compatible client
//! - `client`: one conversation's history and its completion calls
//! - `registry`: per-user conversations with per-user locking
//! - `errors`: completion failure taxonomy

pub mod client;
pub mod completion;
pub mod errors;
pub mod message;
pub mod registry;

pub use client::ConversationClient;
pub use completion::{
    Choice, ChoiceMessage, Completion, CompletionApi, CompletionFuture, CompletionRequest,
    OpenAiCompletionClient, Usage,
};
pub use errors::{ChatError, ChatResult};
pub use message::{Message, Role};
pub use registry::{SessionRegistry, SharedConversation};
