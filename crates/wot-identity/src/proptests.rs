//! Property-based tests for identity components.
//!
//! These tests verify identity invariants:
//!
//! - Uid and public key validation accept/reject correctly
//! - Validity windows are half-open
//! - Pruned is terminal in the state machine

use proptest::prelude::*;

use crate::{IdentityState, PublicKey, Uid, Validity, MAX_UID_LEN, MIN_UID_LEN};

// ==================== Uid Validation Property Tests ====================

proptest! {
    /// Uids built from the allowed alphabet are accepted.
    #[test]
    fn valid_uids_accepted(s in "[a-zA-Z0-9_-]{2,100}") {
        prop_assert!(Uid::new(&s).is_ok());
    }

    /// Uids that are too short are rejected.
    #[test]
    fn short_uids_rejected(len in 0usize..MIN_UID_LEN) {
        let uid: String = (0..len).map(|_| 'a').collect();
        prop_assert!(Uid::new(&uid).is_err());
    }

    /// Uids that are too long are rejected.
    #[test]
    fn long_uids_rejected(extra in 1usize..50) {
        let uid = "a".repeat(MAX_UID_LEN + extra);
        prop_assert!(Uid::new(&uid).is_err());
    }

    /// Any character outside the alphabet makes the uid invalid.
    #[test]
    fn uids_with_spaces_rejected(prefix in "[a-z]{1,10}", suffix in "[a-z]{1,10}") {
        let uid = format!("{} {}", prefix, suffix);
        prop_assert!(Uid::new(&uid).is_err());
    }
}

// ==================== Public Key Property Tests ====================

proptest! {
    /// Base58 strings of key length are accepted.
    #[test]
    fn base58_keys_accepted(s in "[1-9A-HJ-NP-Za-km-z]{43,44}") {
        prop_assert!(PublicKey::new(&s).is_ok());
    }

    /// Keys containing an excluded base58 character are rejected.
    #[test]
    fn keys_with_excluded_chars_rejected(
        prefix in "[1-9A-HJ-NP-Za-km-z]{43}",
        bad in prop::sample::select(vec!['0', 'O', 'I', 'l']),
    ) {
        let key = format!("{}{}", prefix, bad);
        prop_assert!(PublicKey::new(&key).is_err());
    }

    /// Parsing never panics on arbitrary input.
    #[test]
    fn key_parsing_never_panics(s in ".{0,64}") {
        let _ = PublicKey::new(&s);
    }
}

// ==================== Lifecycle Property Tests ====================

proptest! {
    /// A window is valid strictly before `issued_on + period` and expired from then on.
    #[test]
    fn validity_is_half_open(
        issued_on in 0u64..1_000_000_000,
        period in 1u64..100_000_000,
        offset in 0u64..200_000_000,
    ) {
        let window = Validity::new(issued_on, period);
        let now = issued_on + offset;
        prop_assert_eq!(window.is_valid_at(now), offset < period);
    }

    /// Nothing leaves the Pruned state.
    #[test]
    fn pruned_is_terminal(next in prop::sample::select(vec![
        IdentityState::Pending,
        IdentityState::Member,
        IdentityState::ExpiredMember,
        IdentityState::Pruned,
    ])) {
        prop_assert!(IdentityState::Pruned.transition(next).is_err());
    }
}
