//! Canonical signing and constant-time comparison.
//!
//! Bybit signs `timestamp ++ body` (no separator) with HMAC-SHA256 and sends
//! the MAC as lowercase hex in `X-BYBIT-SIGNATURE`. The layout lives in
//! [`signing_input`] alone so a change in the provider contract touches one
//! function.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{error::RejectReason, models::Secret};

type HmacSha256 = Hmac<Sha256>;

/// Length in bytes of an HMAC-SHA256 tag.
pub const SIGNATURE_LEN: usize = 32;

/// Computes the raw HMAC-SHA256 tag for a delivery.
pub fn sign_bytes(secret: &Secret, timestamp: &str, body: &[u8]) -> [u8; SIGNATURE_LEN] {
    let mut mac = HmacSha256::new_from_slice(secret.expose())
        .expect("HMAC accepts keys of any length");
    for part in signing_input(timestamp, body) {
        mac.update(part);
    }

    let mut tag = [0u8; SIGNATURE_LEN];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    tag
}

/// Computes the expected signature as lowercase hex.
///
/// # Example
///
/// ```
/// use bywire_core::{crypto::sign, Secret};
///
/// let secret = Secret::new("s3cr3t").unwrap();
/// let signature = sign(&secret, "1700000000000", br#"{"type":"ping","data":{}}"#);
///
/// assert_eq!(signature.len(), 64);
/// assert_eq!(signature, signature.to_lowercase());
/// ```
pub fn sign(secret: &Secret, timestamp: &str, body: &[u8]) -> String {
    hex::encode(sign_bytes(secret, timestamp, body))
}

/// Byte segments fed to the MAC, in order.
fn signing_input<'a>(timestamp: &'a str, body: &'a [u8]) -> [&'a [u8]; 2] {
    [timestamp.as_bytes(), body]
}

/// Decodes a hex signature header into raw bytes.
///
/// Upper- and lowercase digits are both accepted. The decoded length is not
/// checked here; a wrong-length tag simply fails comparison.
///
/// # Errors
///
/// Returns [`RejectReason::MalformedSignature`] for an empty value, non-hex
/// characters, or an odd number of digits.
pub fn decode_signature(header: &str) -> Result<Vec<u8>, RejectReason> {
    if header.is_empty() {
        return Err(RejectReason::MalformedSignature);
    }
    hex::decode(header).map_err(|_| RejectReason::MalformedSignature)
}

/// Compares two byte strings without short-circuiting on content.
///
/// Lengths are compared first and may return early; length is not secret.
/// For equal lengths every byte pair is XOR-folded into one accumulator that
/// is tested once at the end.
#[inline(never)]
pub fn equal(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }

    std::hint::black_box(diff) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> Secret {
        Secret::new("secret").unwrap()
    }

    #[test]
    fn sign_is_deterministic() {
        let first = sign(&secret(), "1587711043467", br#"{"key":"value"}"#);
        let second = sign(&secret(), "1587711043467", br#"{"key":"value"}"#);

        assert_eq!(first, second);
        assert_eq!(first.len(), SIGNATURE_LEN * 2);
    }

    #[test]
    fn sign_matches_plain_hmac_over_concatenation() {
        let timestamp = "1587711043467";
        let body = br#"{"key":"value"}"#;

        let mut mac = HmacSha256::new_from_slice(b"secret").unwrap();
        mac.update(format!("{timestamp}{}", std::str::from_utf8(body).unwrap()).as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        assert_eq!(sign(&secret(), timestamp, body), expected);
    }

    #[test]
    fn sign_depends_on_every_input() {
        let base = sign(&secret(), "1", b"body");

        assert_ne!(base, sign(&Secret::new("other").unwrap(), "1", b"body"));
        assert_ne!(base, sign(&secret(), "2", b"body"));
        assert_ne!(base, sign(&secret(), "1", b"bodY"));
    }

    #[test]
    fn sign_has_no_separator() {
        // "12" ++ "3" and "1" ++ "23" produce the same input
        assert_eq!(sign(&secret(), "12", b"3"), sign(&secret(), "1", b"23"));
    }

    #[test]
    fn sign_output_is_lowercase() {
        let signature = sign(&secret(), "1700000000000", b"{}");
        assert!(signature.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn decode_signature_accepts_either_case() {
        assert_eq!(decode_signature("0aff").unwrap(), vec![0x0a, 0xff]);
        assert_eq!(decode_signature("0AFF").unwrap(), vec![0x0a, 0xff]);
    }

    #[test]
    fn decode_signature_rejects_malformed() {
        assert_eq!(decode_signature(""), Err(RejectReason::MalformedSignature));
        assert_eq!(decode_signature("abc"), Err(RejectReason::MalformedSignature));
        assert_eq!(decode_signature("zz"), Err(RejectReason::MalformedSignature));
        assert_eq!(decode_signature("sha256=ab"), Err(RejectReason::MalformedSignature));
    }

    #[test]
    fn equal_same() {
        assert!(equal(b"", b""));
        assert!(equal(b"hello", b"hello"));
        assert!(equal(&[7u8; 4096], &[7u8; 4096]));
    }

    #[test]
    fn equal_different() {
        assert!(!equal(b"hello", b"world"));
        assert!(!equal(b"hello", b"hellO"));
        assert!(!equal(b"Hello", b"hello"));
    }

    #[test]
    fn equal_different_length() {
        assert!(!equal(b"hello", b"hello_world"));
        assert!(!equal(b"", b"a"));
    }
}
