//! `X-Line-Signature` verification.
//!
//! LINE signs every webhook body with HMAC-SHA256 keyed by the channel secret
//! and sends the base64 digest in the `X-Line-Signature` header.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::line::errors::{LineError, LineResult};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Checks webhook bodies against the channel secret.
#[derive(Clone)]
pub struct SignatureVerifier {
    channel_secret: String,
}

impl SignatureVerifier {
    /// Create a verifier for `channel_secret`.
    #[must_use]
    pub fn new(channel_secret: impl Into<String>) -> Self {
        Self {
            channel_secret: channel_secret.into(),
        }
    }

    /// Verify `signature` against the raw `body` in constant time.
    ///
    /// # Errors
    /// Returns [`LineError::InvalidSignature`] if the signature is not valid
    /// base64 or does not match.
    pub fn verify(&self, body: &[u8], signature: &str) -> LineResult<()> {
        let expected = STANDARD
            .decode(signature.trim())
            .map_err(|_| LineError::InvalidSignature)?;

        let mut mac = self.mac()?;
        mac.update(body);
        mac.verify_slice(&expected)
            .map_err(|_| LineError::InvalidSignature)
    }

    /// Compute the signature LINE would send for `body`.
    ///
    /// # Errors
    /// Returns an error if the HMAC cannot be keyed.
    pub fn sign(&self, body: &[u8]) -> LineResult<String> {
        let mut mac = self.mac()?;
        mac.update(body);
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    fn mac(&self) -> LineResult<HmacSha256> {
        HmacSha256::new_from_slice(self.channel_secret.as_bytes())
            .map_err(|_| LineError::InvalidSignature)
    }
}
