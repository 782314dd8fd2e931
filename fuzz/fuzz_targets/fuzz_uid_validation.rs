//! Fuzz target for Uid validation.
//!
//! Tests that uid validation handles arbitrary input safely and consistently.

#![no_main]

use libfuzzer_sys::fuzz_target;
use wot_identity::{Uid, MAX_UID_LEN, MIN_UID_LEN};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Should succeed or fail predictably - never panic
        if let Ok(uid) = Uid::new(s) {
            // Lookups are exact: content is kept as given
            assert_eq!(uid.as_str(), s);

            assert!(s.len() >= MIN_UID_LEN);
            assert!(s.len() <= MAX_UID_LEN);
            assert!(s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
        }
    }
});
