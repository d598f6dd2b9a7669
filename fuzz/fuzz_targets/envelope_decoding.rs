#![no_main]

//! Fuzz target for envelope decoding.
//!
//! Decoding runs on authentic but otherwise untrusted bodies, so it must
//! reject anything malformed without panicking.

use bywire_core::decode;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(envelope) = decode(data) {
        let reencoded = serde_json::to_vec(&envelope).expect("envelope serializes");
        let again = decode(&reencoded).expect("re-encoded envelope decodes");
        assert_eq!(envelope, again);
    }
});
