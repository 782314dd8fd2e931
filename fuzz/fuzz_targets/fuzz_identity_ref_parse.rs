//! Fuzz target for IdentityRef::parse.
//!
//! Tests that search strings resolve to a key or a uid, or fail, without
//! panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use wot_identity::{IdentityRef, PublicKey};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(id) = IdentityRef::parse(s) {
            assert_eq!(id.as_str(), s);

            // Key-shaped input always resolves to a key
            if PublicKey::is_valid(s) {
                assert!(matches!(id, IdentityRef::Pubkey(_)));
            }
        }
    }
});
