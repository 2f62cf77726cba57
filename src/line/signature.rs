use crate::{error::Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

pub const SIGNATURE_HEADER: &str = "X-Line-Signature";

type HmacSha256 = Hmac<Sha256>;

/// Checks the base64 encoded HMAC-SHA256 digest of the raw request body.
pub fn verify(channel_secret: &str, body: &[u8], signature: &str) -> Result<()> {
    let expected = STANDARD
        .decode(signature.trim())
        .map_err(|_| Error::InvalidSignature)?;

    let mut mac = new_mac(channel_secret);
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| Error::InvalidSignature)
}

#[cfg(test)]
pub fn sign(channel_secret: &str, body: &[u8]) -> String {
    let mut mac = new_mac(channel_secret);
    mac.update(body);
    STANDARD.encode(mac.finalize().into_bytes())
}

fn new_mac(channel_secret: &str) -> HmacSha256 {
    // HMAC accepts keys of any length
    HmacSha256::new_from_slice(channel_secret.as_bytes()).expect("HMAC key of any size")
}
