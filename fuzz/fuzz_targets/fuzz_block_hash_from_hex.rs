//! Fuzz target for BlockHash::from_hex.
//!
//! Tests that parsing arbitrary text as a block hash is handled safely.

#![no_main]

use libfuzzer_sys::fuzz_target;
use wot_chain::BlockHash;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Should succeed for exactly 64 hex digits, fail otherwise - never panic
        if let Ok(hash) = BlockHash::from_hex(s) {
            assert_eq!(hash.to_hex(), s.to_ascii_lowercase());
            let roundtrip = BlockHash::from_bytes(hash.as_bytes()).unwrap();
            assert_eq!(hash, roundtrip);
        }
    }
});
