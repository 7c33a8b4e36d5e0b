use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Verify a webhook body against its `sha256=<hex>` signature header.
///
/// With no secret configured every request is accepted. This open mode is an
/// insecure default and is only meant for local testing.
///
/// With a secret, a missing header, a header without the `sha256=` prefix,
/// a digest that is not lowercase hex, or a digest that does not match is
/// rejected. The digest
/// comparison is constant-time.
pub fn verify_signature(
    secret: Option<&str>,
    body: &[u8],
    header: Option<&str>,
) -> Result<(), AppError> {
    let secret = match secret.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return Ok(()),
    };

    // Digests are compared as the lowercase hex `sign` emits.
    let hex_sig = header
        .and_then(|h| h.strip_prefix(SIGNATURE_PREFIX))
        .filter(|h| h.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')))
        .ok_or_else(|| AppError::Unauthorized("Missing or invalid signature header".into()))?;

    let expected = hex::decode(hex_sig)
        .map_err(|_| AppError::Unauthorized("Missing or invalid signature header".into()))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("HMAC key error: {e}")))?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| AppError::Unauthorized("Signature mismatch".into()))
}

/// Compute the `sha256=<hex>` header value for `body`.
pub fn sign(secret: &str, body: &[u8]) -> Result<String, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.trim().as_bytes())
        .map_err(|e| AppError::Internal(format!("HMAC key error: {e}")))?;
    mac.update(body);
    Ok(format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    ))
}
