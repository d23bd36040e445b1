//! Error types for the LINE boundary.

use thiserror::Error;

/// Errors raised while authenticating, decoding or answering LINE webhooks.
#[derive(Debug, Error)]
pub enum LineError {
    /// Request carried no `X-Line-Signature` header.
    #[error("missing X-Line-Signature header")]
    MissingSignature,

    /// Signature does not match the body.
    #[error("invalid webhook signature")]
    InvalidSignature,

    /// Body is not a webhook payload.
    #[error("malformed webhook payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// Transport-level failure talking to the Messaging API.
    #[error("LINE API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Messaging API answered with a non-success status.
    #[error("LINE API returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned by the API.
        body: String,
    },

    /// Messaging API base URL could not be used.
    #[error("invalid LINE API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl LineError {
    /// Whether the error means the request could not be authenticated.
    #[must_use]
    pub const fn is_signature_error(&self) -> bool {
        matches!(self, Self::MissingSignature | Self::InvalidSignature)
    }
}

/// Convenience result alias for LINE operations.
pub type LineResult<T> = Result<T, LineError>;
