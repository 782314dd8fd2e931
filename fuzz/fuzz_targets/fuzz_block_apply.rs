//! Fuzz target for block application.
//!
//! Feeds arbitrary JSON block sequences to a chain. Every block must either
//! apply or be rejected without touching the committed state.

#![no_main]

use libfuzzer_sys::fuzz_target;
use wot_chain::{LifecycleEvent, WotChain, WotParams};

fuzz_target!(|data: &[u8]| {
    let blocks: Vec<(u64, Vec<LifecycleEvent>)> = match serde_json::from_slice(data) {
        Ok(blocks) => blocks,
        Err(_) => return,
    };

    let params = WotParams::new()
        .with_idty_window(5)
        .with_ms_validity(20)
        .with_cert_validity_period(40)
        .with_sig_qty(1);
    let mut chain = match WotChain::new(params) {
        Ok(chain) => chain,
        Err(_) => return,
    };

    for (time, events) in blocks {
        let before = chain.snapshot();
        match chain.commit(time, events) {
            Ok(report) => {
                assert_eq!(chain.head().map(|h| h.height), Some(report.height));
            }
            Err(_) => {
                // Rejection is all-or-nothing
                assert_eq!(chain.snapshot().state_digest(), before.state_digest());
                assert_eq!(chain.head(), before.head().copied());
            }
        }
    }
});
