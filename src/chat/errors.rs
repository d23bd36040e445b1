//! Error types for the conversation core.

use std::time::Duration;

use thiserror::Error;

/// A completion turn failed. No variant is retried automatically.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Transport-level failure talking to the completion API.
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Completion API answered with a non-success status.
    #[error("completion API returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned by the API.
        body: String,
    },

    /// Completion did not finish within the configured bound.
    #[error("completion request timed out after {0:?}")]
    Timeout(Duration),

    /// Response had no choice with text content.
    #[error("completion response contained no message content")]
    EmptyChoices,

    /// Completion endpoint could not be built.
    #[error("invalid completion endpoint: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ChatError {
    /// Check if the turn failed because the completion took too long.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Convenience result alias for conversation operations.
pub type ChatResult<T> = Result<T, ChatError>;
