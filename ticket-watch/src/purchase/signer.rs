//! Webhook request signing.
//!
//! The provider authenticates calls with
//! `base64(HMAC-SHA256(key = "{timestamp}\n{secret}", message = ""))`.
//! The key is the concatenation, and the signed message is empty.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ring::hmac;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignError {
    #[error("webhook signing key is not configured")]
    MissingSecret,
}

/// Sign a webhook call made at `timestamp` (Unix seconds).
pub fn sign(secret: &str, timestamp: i64) -> Result<String, SignError> {
    if secret.is_empty() {
        return Err(SignError::MissingSecret);
    }

    let key_material = format!("{timestamp}\n{secret}");
    let key = hmac::Key::new(hmac::HMAC_SHA256, key_material.as_bytes());
    let tag = hmac::sign(&key, b"");
    Ok(STANDARD.encode(tag.as_ref()))
}
