//! Webhook signature verification.
//!
//! The platform signs every delivery with HMAC-SHA256 over
//! `"{timestamp}.{raw body}"` and sends the result in a header of the form
//! `t=<timestamp>,v1=<hex>[,v1=<hex>...]`. Several `v1` entries appear while a
//! signing secret is being rolled; any one of them matching is enough.

use crate::error::{WebhookError, WebhookResult};
use crate::event::Event;
use crate::utils::current_timestamp;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Replay window applied when none is configured.
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

/// The only signature scheme the verifier accepts.
pub const SIGNATURE_SCHEME: &str = "v1";

/// Verifies webhook bodies against a shared signing secret.
///
/// Without a secret the verifier runs in pass-through mode and only
/// normalizes the body. Callers are expected to warn about that mode; the
/// verifier itself never logs.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Option<Vec<u8>>,
    tolerance: Duration,
}

impl SignatureVerifier {
    /// Creates a verifier for the given signing secret.
    #[must_use]
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: Some(secret.as_ref().to_vec()),
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Creates a pass-through verifier that skips signature checks.
    #[must_use]
    pub fn insecure() -> Self {
        Self {
            secret: None,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Creates a verifier from an optional secret; an empty string counts as
    /// no secret.
    #[must_use]
    pub fn from_optional(secret: Option<&str>) -> Self {
        match secret {
            Some(secret) if !secret.is_empty() => Self::new(secret),
            _ => Self::insecure(),
        }
    }

    /// Sets the replay tolerance.
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// True when no signing secret is configured.
    pub fn is_insecure(&self) -> bool {
        self.secret.is_none()
    }

    /// The configured replay tolerance.
    pub fn tolerance(&self) -> Duration {
        self.tolerance
    }

    /// Verifies `body` against `header` using the current wall clock.
    pub fn verify(&self, body: &[u8], header: Option<&str>) -> WebhookResult<Event> {
        self.verify_at(body, header, current_timestamp() as i64)
    }

    /// Verifies `body` against `header` as if the current time were `now`
    /// (seconds since epoch).
    ///
    /// # Errors
    ///
    /// * [`WebhookError::SignatureInvalid`] - header missing or unparsable, or
    ///   no `v1` signature matches
    /// * [`WebhookError::SignatureExpired`] - a signature matches but the
    ///   header timestamp is older than the tolerance
    /// * [`WebhookError::MalformedPayload`] - the verified body is not an event
    pub fn verify_at(&self, body: &[u8], header: Option<&str>, now: i64) -> WebhookResult<Event> {
        let Some(secret) = &self.secret else {
            return Event::from_slice(body);
        };

        let header = SignatureHeader::parse(header.ok_or(WebhookError::SignatureInvalid)?)?;
        let mac = signed_payload_mac(secret, header.timestamp, body);

        // verify_slice compares in constant time
        let matched = header
            .signatures
            .iter()
            .any(|signature| mac.clone().verify_slice(signature).is_ok());
        if !matched {
            return Err(WebhookError::SignatureInvalid);
        }

        let tolerance = i64::try_from(self.tolerance.as_secs()).unwrap_or(i64::MAX);
        if now.saturating_sub(header.timestamp) > tolerance {
            return Err(WebhookError::SignatureExpired {
                timestamp: header.timestamp,
                tolerance: self.tolerance,
            });
        }

        Event::from_slice(body)
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("tolerance", &self.tolerance)
            .finish()
    }
}

/// Parsed form of the signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Signing time, seconds since epoch.
    pub timestamp: i64,
    /// Decoded `v1` signatures.
    pub signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    /// Parses `t=<ts>,v1=<hex>,...`. Unknown schemes and undecodable
    /// signatures are ignored; a missing timestamp or the absence of any
    /// usable `v1` signature is an error.
    pub fn parse(header: &str) -> WebhookResult<Self> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            match key.trim() {
                "t" => {
                    let parsed = value
                        .trim()
                        .parse::<i64>()
                        .map_err(|_| WebhookError::SignatureInvalid)?;
                    timestamp = Some(parsed);
                }
                SIGNATURE_SCHEME => {
                    if let Ok(bytes) = hex::decode(value.trim()) {
                        signatures.push(bytes);
                    }
                }
                _ => {}
            }
        }

        match timestamp {
            Some(timestamp) if !signatures.is_empty() => Ok(Self {
                timestamp,
                signatures,
            }),
            _ => Err(WebhookError::SignatureInvalid),
        }
    }
}

/// Computes the hex `v1` signature for a payload signed at `timestamp`.
#[must_use]
pub fn compute_signature(secret: &[u8], timestamp: i64, body: &[u8]) -> String {
    hex::encode(signed_payload_mac(secret, timestamp, body).finalize().into_bytes())
}

/// Builds a complete signature header value, as the platform would send it.
#[must_use]
pub fn signature_header(secret: &[u8], timestamp: i64, body: &[u8]) -> String {
    format!(
        "t={timestamp},{SIGNATURE_SCHEME}={}",
        compute_signature(secret, timestamp, body)
    )
}

fn signed_payload_mac(secret: &[u8], timestamp: i64, body: &[u8]) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    mac
}
