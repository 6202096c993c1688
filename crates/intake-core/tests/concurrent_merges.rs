//! Near-simultaneous writes for the same work order land on one row.

use std::sync::Arc;
use std::thread;

use intake_core::{
    record_work_order, DecisionContext, DecisionEngine, DecisionOutcome, JobStatus, Ledger,
    LedgerFields, MemoryLedger, MemoryReviewStore, ResolutionOutcome,
};

#[test]
fn parallel_auto_merges_produce_one_row() {
    let ledger = Arc::new(MemoryLedger::new());
    record_work_order(&ledger, "acme.com", "WO-42", LedgerFields::default()).unwrap();
    let engine = Arc::new(DecisionEngine::new(
        Arc::clone(&ledger),
        MemoryReviewStore::new(),
    ));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let issuer = if i % 2 == 0 { "ops@acme.com" } else { "OPS@Portal.ACME.com" };
                let context = DecisionContext::new(issuer, format!("doc-{}", i));
                engine
                    .decide_and_merge(Some(" wo-42"), 0.93, &context)
                    .unwrap()
                    .outcome
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), DecisionOutcome::AutoMerged);
    }

    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.rows()[0].status(), JobStatus::Signed);
}

#[test]
fn resolve_and_auto_merge_racing_share_the_row() {
    let ledger = Arc::new(MemoryLedger::new());
    record_work_order(&ledger, "acme.com", "WO-7", LedgerFields::default()).unwrap();
    let engine = Arc::new(DecisionEngine::new(
        Arc::clone(&ledger),
        MemoryReviewStore::new(),
    ));

    let review_id = engine
        .decide_and_merge(Some("WO-?"), 0.2, &DecisionContext::new("acme.com", "scan-a"))
        .unwrap()
        .review_id
        .unwrap();

    let resolver = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || engine.resolve_review(&review_id, "WO-7", None).unwrap())
    };
    let merger = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            engine
                .decide_and_merge(Some("WO-7"), 0.99, &DecisionContext::new("acme.com", "scan-b"))
                .unwrap()
        })
    };

    assert_eq!(
        resolver.join().unwrap().outcome,
        ResolutionOutcome::ResolvedUpdated
    );
    assert_eq!(merger.join().unwrap().outcome, DecisionOutcome::AutoMerged);

    assert_eq!(ledger.len(), 1);
    let row = ledger.get_row("acme_com:wo7").unwrap().unwrap();
    assert_eq!(row.status(), JobStatus::Signed);
}
