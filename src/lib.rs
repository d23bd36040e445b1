//! LINE webhook relay to a chat-completion model, keeping one conversation per user.

// Interdiction stricte de pratiques dangereuses ou non idiomatiques
#![deny(unsafe_code)] // Le code unsafe est interdit
#![deny(missing_docs)] // Toute fonction, struct, enum ou module public doit être documenté
#![deny(non_camel_case_types)]
#![deny(unused_must_use)] // Oblige à gérer explicitement les Result et Option
#![deny(nonstandard_style)]
#![forbid(unsafe_op_in_unsafe_fn)]

// Clippy pour stricte discipline
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
#![deny(clippy::unwrap_used)] // Interdit unwrap()
#![deny(clippy::expect_used)] // Interdit expect()
#![deny(clippy::panic)] // Interdit panic!()
#![deny(clippy::print_stdout)] // Les logs passent par tracing
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_in_result)]
#![deny(clippy::redundant_clone)]
#![deny(clippy::cognitive_complexity)]

#![deny(overflowing_literals)]

/// Conversation core: messages, completion client, per-user sessions.
#[allow(clippy::module_name_repetitions, clippy::missing_const_for_fn)]
pub mod chat;
/// Environment configuration.
pub mod config;
/// LINE Messaging API boundary: signatures, webhook events, replies.
#[allow(clippy::module_name_repetitions)]
pub mod line;
/// HTTP server and webhook routes.
#[allow(
    clippy::missing_errors_doc,
    clippy::missing_const_for_fn,
    clippy::unused_async
)]
pub mod server;
/// Entry helpers to start the relay.
pub mod start_relay;

#[cfg(test)]
mod testing;
