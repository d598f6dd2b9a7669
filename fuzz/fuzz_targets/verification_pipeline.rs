#![no_main]

//! Fuzz target for the verification pipeline.
//!
//! Splits the input into timestamp, signature, and body, and checks that
//! verification never panics and never accepts a signature it did not
//! compute itself.

use std::time::{Duration, UNIX_EPOCH};

use bywire_core::{crypto, Secret, Verifier, WebhookRequest};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    fuzz_verification(data);
});

fn fuzz_verification(data: &[u8]) {
    let Ok(secret) = Secret::new("fuzz-secret") else { return };
    let verifier = Verifier::with_default_tolerance(secret.clone());
    let now = UNIX_EPOCH + Duration::from_millis(1_700_000_000_000);

    let mut parts = data.splitn(3, |&b| b == b'\n');
    let timestamp = parts.next().and_then(|p| std::str::from_utf8(p).ok());
    let signature = parts.next().and_then(|p| std::str::from_utf8(p).ok());
    let body = parts.next().unwrap_or_default();

    let request = WebhookRequest { body, signature, timestamp };
    let result = verifier.verify(&request, now);

    if result.is_verified() {
        let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
            panic!("verified without both headers");
        };
        assert_eq!(
            signature.to_ascii_lowercase(),
            crypto::sign(&secret, timestamp, body),
            "accepted a signature the signer did not produce"
        );
    }

    // Arbitrary pairs must compare without panicking.
    let (left, right) = data.split_at(data.len() / 2);
    assert_eq!(crypto::equal(left, right), left == right);
}
