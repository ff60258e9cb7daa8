//! Slack-style webhook signature verification
//!
//! A request is authentic when its `v0=` signature equals
//! `HMAC-SHA256(secret, "v0:{timestamp}:{raw_body}")` and the timestamp lies
//! within the replay window of the local clock.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use std::time::Duration;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_VERSION: &str = "v0";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
pub const SIGNATURE_HEADER: &str = "x-slack-signature";

/// Reasons an inbound callback is rejected at the boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("missing request timestamp")]
    MissingTimestamp,

    #[error("missing request signature")]
    MissingSignature,

    #[error("malformed request timestamp: {0}")]
    MalformedTimestamp(String),

    #[error("request timestamp outside replay window (skew {skew_secs}s)")]
    Stale { skew_secs: u64 },

    #[error("signature mismatch")]
    SignatureMismatch,

    #[error("invalid signing secret")]
    InvalidSecret,
}

/// Signature-relevant headers of an inbound request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureHeaders {
    pub timestamp: Option<String>,
    pub signature: Option<String>,
}

impl SignatureHeaders {
    pub fn new(timestamp: Option<&str>, signature: Option<&str>) -> Self {
        Self {
            timestamp: timestamp.map(str::to_string),
            signature: signature.map(str::to_string),
        }
    }
}

/// Compute the `v0=<hex>` signature for a request body
pub fn sign(secret: &[u8], timestamp: &str, raw_body: &[u8]) -> Result<String, AuthFailure> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| AuthFailure::InvalidSecret)?;
    mac.update(SIGNATURE_VERSION.as_bytes());
    mac.update(b":");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(raw_body);
    Ok(format!("{}={}", SIGNATURE_VERSION, hex::encode(mac.finalize().into_bytes())))
}

/// Verifies inbound callbacks against the shared signing secret
#[derive(Clone)]
pub struct WebhookAuthenticator {
    secret: Vec<u8>,
    replay_window: Duration,
}

impl std::fmt::Debug for WebhookAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookAuthenticator")
            .field("secret", &"<redacted>")
            .field("replay_window", &self.replay_window)
            .finish()
    }
}

impl WebhookAuthenticator {
    pub fn new(secret: impl AsRef<[u8]>, replay_window: Duration) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            replay_window,
        }
    }

    pub fn replay_window(&self) -> Duration {
        self.replay_window
    }

    /// True when the request is authentic and fresh
    pub fn authenticate(&self, raw_body: &[u8], headers: &SignatureHeaders) -> bool {
        self.verify(raw_body, headers).is_ok()
    }

    /// Verify against the current wall clock
    pub fn verify(&self, raw_body: &[u8], headers: &SignatureHeaders) -> Result<(), AuthFailure> {
        self.verify_at(raw_body, headers, chrono::Utc::now().timestamp())
    }

    /// Verify against an explicit `now` (Unix seconds)
    pub fn verify_at(
        &self,
        raw_body: &[u8],
        headers: &SignatureHeaders,
        now: i64,
    ) -> Result<(), AuthFailure> {
        let timestamp = headers.timestamp.as_deref().ok_or(AuthFailure::MissingTimestamp)?;
        let supplied = headers.signature.as_deref().ok_or(AuthFailure::MissingSignature)?;

        let issued_at: i64 = timestamp
            .parse()
            .map_err(|_| AuthFailure::MalformedTimestamp(timestamp.to_string()))?;

        let skew_secs = now.abs_diff(issued_at);
        if skew_secs > self.replay_window.as_secs() {
            return Err(AuthFailure::Stale { skew_secs });
        }

        let expected = sign(&self.secret, timestamp, raw_body)?;

        // ct_eq on slices of unequal length is false without early exit on content
        if bool::from(expected.as_bytes().ct_eq(supplied.as_bytes())) {
            Ok(())
        } else {
            Err(AuthFailure::SignatureMismatch)
        }
    }
}
