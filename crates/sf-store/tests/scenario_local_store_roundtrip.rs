use std::sync::Arc;

use sf_ledger::{PortfolioService, MICROS_SCALE};
use sf_store::LocalStore;
use uuid::Uuid;

const M: i64 = MICROS_SCALE;

#[test]
fn scenario_snapshot_survives_a_restart() {
    let root = tempfile::tempdir().expect("tempdir");
    let actor = Uuid::new_v4();

    // First session: trade, snapshots land on disk after each mutation.
    {
        let store = Arc::new(LocalStore::open(root.path(), actor).unwrap());
        let svc = PortfolioService::with_store(actor, 1_000_000 * M, store);
        svc.buy("AAPL", 10 * M, 150 * M, 0).unwrap();
        svc.sell("AAPL", 4 * M, 180 * M, 0).unwrap();
    }

    // Second session: a fresh service over the same directory rehydrates.
    let store = Arc::new(LocalStore::open(root.path(), actor).unwrap());
    let svc = PortfolioService::with_store(actor, 999 * M, store);

    let snap = svc.snapshot();
    // 1,000,000 - 1,500 + 720
    assert_eq!(snap.cash_micros, 999_220 * M);
    assert_eq!(snap.trades.len(), 2);
    assert_eq!(snap.holdings.get("AAPL").unwrap().qty_micros, 6 * M);
    assert!(svc.verify_integrity());
}

#[test]
fn scenario_journal_hash_chain_verifies_and_extends_across_reopen() {
    let root = tempfile::tempdir().expect("tempdir");
    let actor = Uuid::new_v4();

    {
        let store = Arc::new(LocalStore::open(root.path(), actor).unwrap());
        let svc = PortfolioService::with_store(actor, 10_000 * M, store.clone());
        svc.buy("AAPL", M, 100 * M, 0).unwrap();
        svc.buy("TSLA", M, 200 * M, 0).unwrap();
        assert_eq!(store.verify_journal().unwrap(), 2);
    }

    // Reopen: the chain tail is restored, appends keep linking.
    let store = Arc::new(LocalStore::open(root.path(), actor).unwrap());
    {
        let svc = PortfolioService::with_store(actor, 10_000 * M, store.clone());
        svc.sell("AAPL", M, 120 * M, 0).unwrap();
    }
    assert_eq!(store.verify_journal().unwrap(), 3);

    let journal = store.read_journal().unwrap();
    assert_eq!(journal.len(), 3);
    assert_eq!(journal[2].symbol, "AAPL");
    assert_eq!(journal[2].realized_gain_micros, Some(20 * M));
}

#[test]
fn scenario_tampered_journal_is_detected() {
    let root = tempfile::tempdir().expect("tempdir");
    let actor = Uuid::new_v4();

    let store = LocalStore::open(root.path(), actor).unwrap();
    {
        let svc = PortfolioService::with_store(
            actor,
            10_000 * M,
            Arc::new(LocalStore::open(root.path(), actor).unwrap()),
        );
        svc.buy("AAPL", M, 100 * M, 0).unwrap();
        svc.buy("AAPL", M, 110 * M, 0).unwrap();
    }

    // Flip a digit inside the journal body.
    let path = store.journal_path();
    let raw = std::fs::read_to_string(&path).unwrap();
    let tampered = raw.replacen("100000000", "100000001", 1);
    assert_ne!(raw, tampered, "tamper target must exist");
    std::fs::write(&path, tampered).unwrap();

    assert!(store.verify_journal().is_err());
}

#[test]
fn scenario_missing_snapshot_loads_as_none() {
    let root = tempfile::tempdir().expect("tempdir");
    let store = LocalStore::open(root.path(), Uuid::new_v4()).unwrap();
    assert!(store.load_snapshot().unwrap().is_none());
    assert_eq!(store.verify_journal().unwrap(), 0);
}
