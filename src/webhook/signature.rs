//! Slack request signature verification.
//!
//! Validates `X-Slack-Signature` and `X-Slack-Request-Timestamp` on
//! incoming Events API requests.
//!
//! See: <https://api.slack.com/authentication/verifying-requests-from-slack>

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

/// Requests older (or further in the future) than this are rejected.
pub const MAX_TIMESTAMP_SKEW_SECS: i64 = 60 * 5;

const VERSION: &str = "v0";

/// Compute the `v0=<hex>` signature Slack would send for this request.
///
/// Returns `None` only if the secret is empty.
pub fn sign_slack_request(signing_secret: &str, timestamp: &str, body: &[u8]) -> Option<String> {
    if signing_secret.is_empty() {
        return None;
    }
    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes()).ok()?;
    mac.update(VERSION.as_bytes());
    mac.update(b":");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    Some(format!("{VERSION}={}", hex::encode(mac.finalize().into_bytes())))
}

/// Verify a Slack request signature.
///
/// Slack signs each request with HMAC-SHA256 using:
/// - basestring = `v0:` ++ `timestamp` ++ `:` ++ `body` (raw bytes)
/// - key = the app's signing secret
/// - header = `v0=` ++ hex(mac)
///
/// Returns `true` if the signature is valid, `false` on any error
/// (empty secret, non-numeric or stale timestamp, mismatch, etc.).
pub fn verify_slack_signature(
    signing_secret: &str,
    signature: &str,
    timestamp: &str,
    body: &[u8],
    now_secs: i64,
) -> bool {
    // Staleness check: reject non-numeric or stale/future timestamps
    let Ok(ts) = timestamp.parse::<i64>() else {
        return false;
    };
    if (now_secs - ts).abs() > MAX_TIMESTAMP_SKEW_SECS {
        return false;
    }
    if !signature.starts_with("v0=") {
        return false;
    }
    let Some(expected) = sign_slack_request(signing_secret, timestamp, body) else {
        return false;
    };

    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}
