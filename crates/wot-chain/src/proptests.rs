//! Property-based tests for block application.
//!
//! These tests verify consensus invariants:
//!
//! - Replaying the same blocks always yields the same state digest
//! - Pending identities disappear exactly at the end of their window
//! - Renewal replaces the membership window, it never stacks
//! - A certification from a lapsed member does not count

use proptest::prelude::*;
use wot_identity::{IdentityRef, PublicKey, Uid, Validity};

use crate::block::LifecycleEvent;
use crate::chain::WotChain;
use crate::config::{IdentityReusePolicy, WotParams};
use crate::evaluator::LifecycleEvaluator;
use crate::store::TrustGraph;

const T0: u64 = 1_480_000_000;
const POOL: usize = 6;
const ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

fn pool_key(i: usize) -> PublicKey {
    let c = ALPHABET[i % ALPHABET.len()] as char;
    PublicKey::new(&format!("{}{}", c.to_string().repeat(4), "1".repeat(40))).unwrap()
}

fn pool_uid(i: usize) -> Uid {
    Uid::new(&format!("member_{}", i)).unwrap()
}

fn event_strategy() -> impl Strategy<Value = LifecycleEvent> {
    let idx = 0..POOL;
    prop_oneof![
        idx.clone().prop_map(|i| LifecycleEvent::CreateIdentity {
            pubkey: pool_key(i),
            uid: pool_uid(i),
        }),
        (idx.clone(), idx.clone()).prop_map(|(a, b)| LifecycleEvent::Certify {
            from: pool_key(a),
            to: pool_key(b),
        }),
        idx.clone().prop_map(|i| LifecycleEvent::Join { pubkey: pool_key(i) }),
        idx.prop_map(|i| LifecycleEvent::Renew { pubkey: pool_key(i) }),
    ]
}

fn blocks_strategy() -> impl Strategy<Value = Vec<(u64, Vec<LifecycleEvent>)>> {
    prop::collection::vec(
        (0u64..20, prop::collection::vec(event_strategy(), 0..8)),
        1..12,
    )
}

fn params() -> WotParams {
    WotParams::new()
        .with_idty_window(15)
        .with_ms_validity(30)
        .with_cert_validity_period(45)
        .with_sig_qty(1)
}

/// Apply every block, skipping rejected ones. Returns outcomes and digest.
fn replay(blocks: &[(u64, Vec<LifecycleEvent>)]) -> (Vec<bool>, [u8; 32]) {
    let mut chain = WotChain::new(params()).unwrap();
    let mut time = T0;
    let mut outcomes = Vec::new();
    for (step, events) in blocks {
        time += step;
        outcomes.push(chain.commit(time, events.clone()).is_ok());
    }
    (outcomes, chain.snapshot().state_digest())
}

// ==================== Determinism Property Tests ====================

proptest! {
    /// Two replays of the same blocks agree on every outcome and the digest.
    #[test]
    fn replay_is_deterministic(blocks in blocks_strategy()) {
        let first = replay(&blocks);
        let second = replay(&blocks);
        prop_assert_eq!(first, second);
    }
}

// ==================== Expiry Property Tests ====================

proptest! {
    /// A never-member is present strictly before `created_on + idty_window`.
    #[test]
    fn pending_window_boundary(window in 1u64..1_000, elapsed in 0u64..2_000) {
        let params = WotParams::new().with_idty_window(window);
        let mut chain = WotChain::new(params).unwrap();
        chain
            .commit(T0, vec![LifecycleEvent::CreateIdentity {
                pubkey: pool_key(0),
                uid: pool_uid(0),
            }])
            .unwrap();
        chain.commit(T0 + elapsed, vec![]).unwrap();

        let found = chain
            .snapshot()
            .graph()
            .find(&IdentityRef::Pubkey(pool_key(0)))
            .is_some();
        prop_assert_eq!(found, elapsed < window);
    }

    /// Renewal yields `renewal_time + ms_validity`, never the sum of periods.
    #[test]
    fn renewal_never_stacks(validity in 2u64..10_000, fraction in 0u64..100) {
        let renew_at = T0 + validity * fraction / 100;
        let params = WotParams::new().with_ms_validity(validity).with_sig_qty(1);
        let mut chain = WotChain::new(params).unwrap();
        chain
            .commit(T0, vec![
                LifecycleEvent::CreateIdentity { pubkey: pool_key(0), uid: pool_uid(0) },
                LifecycleEvent::CreateIdentity { pubkey: pool_key(1), uid: pool_uid(1) },
                LifecycleEvent::Certify { from: pool_key(0), to: pool_key(1) },
                LifecycleEvent::Certify { from: pool_key(1), to: pool_key(0) },
                LifecycleEvent::Join { pubkey: pool_key(0) },
                LifecycleEvent::Join { pubkey: pool_key(1) },
            ])
            .unwrap();
        chain
            .commit(renew_at, vec![LifecycleEvent::Renew { pubkey: pool_key(0) }])
            .unwrap();

        let state = chain.snapshot();
        let membership = state.graph().get(&pool_key(0)).unwrap().membership.unwrap();
        prop_assert_eq!(membership.expires_on, renew_at + validity);
    }

    /// A live certification stops counting once its issuer's membership lapses.
    #[test]
    fn lapsed_issuer_does_not_count(
        ms_validity in 1u64..1_000,
        after in 0u64..1_000,
    ) {
        let params = WotParams::new()
            .with_ms_validity(ms_validity)
            .with_cert_validity_period(10_000);
        let mut graph = TrustGraph::new(IdentityReusePolicy::Forbid);
        graph.record_identity(pool_key(0), pool_uid(0), T0, 0).unwrap();
        graph.record_identity(pool_key(1), pool_uid(1), T0, 0).unwrap();
        graph
            .record_membership(&pool_key(0), Validity::new(T0, ms_validity))
            .unwrap();
        graph.record_certification(&pool_key(0), &pool_key(1), T0).unwrap();

        let evaluator = LifecycleEvaluator::new(&params);
        let receiver = graph.get(&pool_key(1)).unwrap();
        let now = T0 + ms_validity + after;
        prop_assert_eq!(evaluator.valid_certifications(&graph, receiver, now), 0);
        prop_assert_eq!(
            evaluator.valid_certifications(&graph, receiver, T0 + ms_validity - 1),
            1
        );
    }
}
