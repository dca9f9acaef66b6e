//! Credential checks shared by the providers.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Verify a `sha256=<hex>` header against HMAC-SHA256(secret, body).
pub fn verify_hmac_sha256(secret: &[u8], body: &[u8], header: &str) -> Result<(), String> {
    let hex_digest = header
        .strip_prefix("sha256=")
        .ok_or_else(|| "signature header must start with sha256=".to_string())?;
    let expected = hex::decode(hex_digest.trim())
        .map_err(|_| "signature is not valid hex".to_string())?;
    let mut mac =
        HmacSha256::new_from_slice(secret).map_err(|_| "unusable webhook secret".to_string())?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| "signature mismatch".to_string())
}

/// `sha256=<hex>` header value for a body; what a sender computes.
pub fn sign_hmac_sha256(secret: &[u8], body: &[u8]) -> String {
    // HMAC accepts keys of any length, so construction cannot fail.
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time equality for shared tokens.
pub fn tokens_match(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}
