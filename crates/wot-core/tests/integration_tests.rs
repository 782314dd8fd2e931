//! Integration tests for wot-core.
//!
//! These tests drive the engine through whole block sequences and check
//! what requirements queries report: identity window expiry, two-phase
//! membership expiry, genesis bootstrap, renewal, block atomicity and
//! concurrent reads.

use std::sync::Arc;

use wot_chain::{Block, ChainError, IdentityReusePolicy, LifecycleEvent};
use wot_core::{CoreError, EngineConfig, EngineConfigBuilder, RequirementsResult, WotEngine};
use wot_identity::{IdentityRef, IdentityState, PublicKey, Uid};

const T0: u64 = 1_480_000_000;

// ============================================================================
// Helpers
// ============================================================================

fn key(s: &str) -> PublicKey {
    PublicKey::new(s).unwrap()
}

fn cat() -> PublicKey {
    key("HgTTJLAQ5sqfknMq7yLPZbehtuLSsKj9CxWN7k8QvYJd")
}

fn tac() -> PublicKey {
    key("2LvDg21dVXvetTD9GdkPLURavLYEqP3whauvPWX4c2qc")
}

fn tic() -> PublicKey {
    key("DNann1Lh55eZMEDXeYt59bzHbA3NJR46DeQYCS2qQdLV")
}

fn toc() -> PublicKey {
    key("DKpQPUL4ckzXYdnDRvCRKAm1gNvSdmAXnTrJZ7LvM5Qo")
}

fn create(pubkey: PublicKey, uid: &str) -> LifecycleEvent {
    LifecycleEvent::CreateIdentity {
        pubkey,
        uid: Uid::new(uid).unwrap(),
    }
}

fn certify(from: PublicKey, to: PublicKey) -> LifecycleEvent {
    LifecycleEvent::Certify { from, to }
}

fn join(pubkey: PublicKey) -> LifecycleEvent {
    LifecycleEvent::Join { pubkey }
}

fn renew(pubkey: PublicKey) -> LifecycleEvent {
    LifecycleEvent::Renew { pubkey }
}

/// Network of the expiry test suite: idtyWindow 1s, sigQty 1.
fn config(ms_validity: u64) -> EngineConfig {
    EngineConfigBuilder::new()
        .with_currency("bb")
        .with_idty_window(1)
        .with_ms_validity(ms_validity)
        .with_sig_qty(1)
        .with_forksize(3)
        .build_validated()
        .unwrap()
}

/// cat and tac certify each other and join; tic only self-certifies.
fn genesis_events() -> Vec<LifecycleEvent> {
    vec![
        create(cat(), "cat"),
        create(tac(), "tac"),
        create(tic(), "tic"),
        certify(cat(), tac()),
        certify(tac(), cat()),
        join(cat()),
        join(tac()),
    ]
}

async fn engine(ms_validity: u64) -> WotEngine {
    let engine = WotEngine::new(config(ms_validity)).unwrap();
    engine.commit(T0, genesis_events()).await.unwrap();
    engine
}

async fn lookup(engine: &WotEngine, search: &str) -> RequirementsResult {
    engine.requirements_for(search).await.unwrap()
}

// ============================================================================
// Reference Scenarios
// ============================================================================

mod scenarios {
    use super::*;

    #[tokio::test]
    async fn test_pending_identity_gone_after_window() {
        let engine = engine(10_000).await;
        engine.commit(T0 + 10, vec![]).await.unwrap();
        engine.commit(T0 + 10, vec![]).await.unwrap();

        let result = lookup(&engine, tic().as_str()).await;
        assert_eq!(result, RequirementsResult::NotFound);
        assert_eq!(lookup(&engine, "tic").await, RequirementsResult::NotFound);
    }

    #[tokio::test]
    async fn test_genesis_members_found() {
        let engine = engine(10_000).await;

        let result = lookup(&engine, cat().as_str()).await;
        let req = result.found().expect("cat should be found");
        assert_eq!(req.pubkey, cat());
        assert_eq!(req.uid.as_str(), "cat");
        assert!(req.member);
        assert!(!req.expired);
        assert_eq!(req.valid_certifications, 1);
        assert_eq!(req.reference_time, T0);
    }

    #[tokio::test]
    async fn test_late_member_outlives_its_identity_window() {
        let engine = engine(10).await;
        engine
            .commit(
                T0 + 5,
                vec![create(toc(), "toc"), certify(cat(), toc()), join(toc())],
            )
            .await
            .unwrap();

        engine.commit(T0 + 10, vec![]).await.unwrap();
        let toc_req = lookup(&engine, "toc").await.into_option().unwrap();
        assert!(toc_req.member);
        assert!(!toc_req.expired);
        assert_eq!(toc_req.membership_expires_in, Some(5));

        // Founders lapsed exactly at T0 + 10.
        let cat_req = lookup(&engine, "cat").await.into_option().unwrap();
        assert!(!cat_req.member);
        assert!(cat_req.expired);

        engine.commit(T0 + 14, vec![]).await.unwrap();
        let toc_req = lookup(&engine, "toc").await.into_option().unwrap();
        assert!(toc_req.member);
        assert!(!toc_req.expired);
        assert_eq!(lookup(&engine, "cat").await, RequirementsResult::NotFound);
    }
}

// ============================================================================
// Expiry Tests
// ============================================================================

mod expiry {
    use super::*;

    #[tokio::test]
    async fn test_two_phase_membership_expiry() {
        let engine = engine(10).await;

        // Block exactly at expiry: still found, flagged.
        let report = engine.commit(T0 + 10, vec![]).await.unwrap();
        assert!(report.expired.contains(&cat()));
        assert!(!report.pruned.contains(&cat()));

        let req = lookup(&engine, "cat").await.into_option().unwrap();
        assert_eq!(req.state, IdentityState::ExpiredMember);
        assert!(req.expired);
        assert!(req.was_member);
        assert_eq!(req.membership_expires_in, Some(0));

        // One block further: gone.
        let report = engine.commit(T0 + 11, vec![]).await.unwrap();
        assert!(report.pruned.contains(&cat()));
        assert_eq!(lookup(&engine, "cat").await, RequirementsResult::NotFound);
    }

    #[tokio::test]
    async fn test_member_valid_until_last_second() {
        let engine = engine(10).await;
        engine.commit(T0 + 9, vec![]).await.unwrap();

        let req = lookup(&engine, "cat").await.into_option().unwrap();
        assert!(req.member);
        assert_eq!(req.membership_expires_in, Some(1));
    }

    #[tokio::test]
    async fn test_certification_from_lapsed_issuer_does_not_count() {
        let engine = engine(10).await;
        engine
            .commit(
                T0 + 5,
                vec![create(toc(), "toc"), certify(cat(), toc()), join(toc())],
            )
            .await
            .unwrap();
        engine.commit(T0 + 10, vec![]).await.unwrap();

        let req = lookup(&engine, "toc").await.into_option().unwrap();
        assert_eq!(req.certifications.len(), 1);
        let cert = &req.certifications[0];
        assert_eq!(cert.from, cat());
        assert!(cert.expires_in > 0);
        assert!(!cert.issuer_is_member);
        assert!(!cert.counts);
        assert_eq!(req.valid_certifications, 0);
        assert_eq!(req.missing_certifications, 1);
    }

    #[tokio::test]
    async fn test_renewal_does_not_stack() {
        let engine = engine(100).await;
        engine.commit(T0 + 40, vec![renew(cat())]).await.unwrap();

        let req = lookup(&engine, "cat").await.into_option().unwrap();
        assert_eq!(req.membership_expires_in, Some(100));

        let state = engine.snapshot().await;
        let ms = state.graph().get(&cat()).unwrap().membership.unwrap();
        assert_eq!(ms.expires_on, T0 + 40 + 100);
    }

    #[tokio::test]
    async fn test_rejoin_clears_expired_flag() {
        let engine = engine(10).await;
        engine.commit(T0 + 5, vec![renew(tac())]).await.unwrap();
        engine.commit(T0 + 10, vec![]).await.unwrap();

        // tac still certifies cat, so cat is kept while expired.
        engine.commit(T0 + 11, vec![]).await.unwrap();
        let req = lookup(&engine, "cat").await.into_option().unwrap();
        assert!(req.expired);
        assert_eq!(req.valid_certifications, 1);

        let report = engine.commit(T0 + 12, vec![join(cat())]).await.unwrap();
        assert_eq!(report.joined, vec![cat()]);
        let req = lookup(&engine, "cat").await.into_option().unwrap();
        assert!(req.member);
        assert!(!req.expired);
        assert_eq!(req.state, IdentityState::Member);
    }
}

// ============================================================================
// Block Rejection Tests
// ============================================================================

mod rejection {
    use super::*;

    #[tokio::test]
    async fn test_rejected_block_changes_nothing() {
        let engine = engine(10_000).await;
        let digest = engine.state_digest().await;
        let head = engine.head().await;

        let err = engine
            .commit(
                T0,
                vec![create(toc(), "toc"), certify(toc(), tic()), join(tic())],
            )
            .await
            .unwrap_err();
        assert!(err.is_block_rejection());
        assert!(matches!(
            err,
            CoreError::Chain(ChainError::InsufficientCertifications { .. })
        ));

        assert_eq!(engine.state_digest().await, digest);
        assert_eq!(engine.head().await, head);
        assert_eq!(lookup(&engine, "toc").await, RequirementsResult::NotFound);
    }

    #[tokio::test]
    async fn test_duplicate_uid_rejected() {
        let engine = engine(10_000).await;
        let err = engine
            .commit(T0 + 1, vec![create(toc(), "cat")])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Chain(ChainError::DuplicateIdentity(_))
        ));
    }

    #[tokio::test]
    async fn test_block_not_extending_head_rejected() {
        let engine = engine(10_000).await;
        let orphan = Block::new(1, T0 + 1, None, vec![]);
        let err = engine.apply_block(&orphan).await.unwrap_err();
        assert!(matches!(err, CoreError::Chain(ChainError::InvalidBlock(_))));
    }

    #[tokio::test]
    async fn test_pruned_identity_cannot_be_recreated() {
        let engine = engine(10_000).await;
        engine.commit(T0 + 10, vec![]).await.unwrap();

        let err = engine
            .commit(T0 + 11, vec![create(tic(), "tic")])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Chain(ChainError::DuplicateIdentity(_))
        ));
    }

    #[tokio::test]
    async fn test_allow_policy_recreates_pruned_identity() {
        let config = EngineConfigBuilder::new()
            .with_params(config(10_000).params)
            .with_reuse_policy(IdentityReusePolicy::Allow)
            .build_validated()
            .unwrap();
        let engine = WotEngine::new(config).unwrap();
        engine.commit(T0, genesis_events()).await.unwrap();
        engine.commit(T0 + 10, vec![]).await.unwrap();

        engine
            .commit(T0 + 11, vec![create(tic(), "tic")])
            .await
            .unwrap();
        let req = lookup(&engine, "tic").await.into_option().unwrap();
        assert_eq!(req.created_on, T0 + 11);
    }
}

// ============================================================================
// Determinism Tests
// ============================================================================

mod determinism {
    use super::*;

    async fn run() -> (WotEngine, Vec<RequirementsResult>) {
        let engine = engine(10).await;
        engine
            .commit(
                T0 + 5,
                vec![create(toc(), "toc"), certify(cat(), toc()), join(toc())],
            )
            .await
            .unwrap();
        engine.commit(T0 + 10, vec![]).await.unwrap();
        engine.commit(T0 + 14, vec![]).await.unwrap();

        let mut results = Vec::new();
        for search in ["cat", "tac", "tic", "toc"] {
            results.push(lookup(&engine, search).await);
        }
        (engine, results)
    }

    #[tokio::test]
    async fn test_replay_yields_identical_state() {
        let (first, first_results) = run().await;
        let (second, second_results) = run().await;

        assert_eq!(first.state_digest().await, second.state_digest().await);
        assert_eq!(first.head().await, second.head().await);
        assert_eq!(first_results, second_results);
    }
}

// ============================================================================
// Concurrency Tests
// ============================================================================

mod concurrency {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_see_whole_blocks() {
        let engine = Arc::new(engine(1_000).await);

        let mut readers = Vec::new();
        for _ in 0..4 {
            let engine = Arc::clone(&engine);
            readers.push(tokio::spawn(async move {
                for _ in 0..200 {
                    let result = engine.requirements(&IdentityRef::Pubkey(cat())).await;
                    let req = result.into_option().expect("cat is never pruned");
                    // Block h is committed at T0 + h.
                    assert_eq!(req.reference_time, T0 + req.head_height);
                    tokio::task::yield_now().await;
                }
            }));
        }

        for height in 1..=50u64 {
            engine.commit(T0 + height, vec![]).await.unwrap();
            tokio::task::yield_now().await;
        }

        for reader in readers {
            reader.await.unwrap();
        }
        assert_eq!(engine.head().await.unwrap().height, 50);
    }
}
