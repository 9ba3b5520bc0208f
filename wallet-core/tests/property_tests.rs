//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Balance conservation: total == credited - debited
//! - Idempotency: duplicate uuids collapse onto one entry
//! - Audit snapshots: balance_after matches the running balance
//! - Concurrency: N credits of A always sum to exactly N*A

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;
use wallet_core::{Config, DrOrCr, EntryDraft, EntryKind, Error, Ledger};

/// Strategy for generating valid amounts (positive decimals, 2dp)
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1u64..1_000_000_00u64).prop_map(|cents| Decimal::new(cents as i64, 2))
}

/// Strategy for generating entry directions
fn direction_strategy() -> impl Strategy<Value = DrOrCr> {
    prop_oneof![Just(DrOrCr::Credit), Just(DrOrCr::Debit)]
}

/// Strategy for cash-family entry kinds (direction-compatible)
fn cash_kind_for(dr_or_cr: DrOrCr) -> impl Strategy<Value = EntryKind> {
    match dr_or_cr {
        DrOrCr::Credit => prop_oneof![
            Just(EntryKind::Transaction),
            Just(EntryKind::Onramp),
        ]
        .boxed(),
        DrOrCr::Debit => prop_oneof![
            Just(EntryKind::Transaction),
            Just(EntryKind::Offramp),
        ]
        .boxed(),
    }
}

/// Strategy for a sequence of (kind, direction, amount) operations
fn ops_strategy() -> impl Strategy<Value = Vec<(EntryKind, DrOrCr, Decimal)>> {
    prop::collection::vec(
        direction_strategy().prop_flat_map(|d| {
            (cash_kind_for(d), Just(d), amount_strategy())
                .prop_map(|(k, d, a)| (k, d, a))
        }),
        1..30,
    )
}

/// Create test ledger with temp directory
fn create_test_ledger() -> (Ledger, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.data_dir = temp_dir.path().to_path_buf();
    (Ledger::open(config).unwrap(), temp_dir)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: after any sequence of accepted operations, the cash
    /// conservation invariant holds and balance never went negative.
    #[test]
    fn prop_balance_conservation(ops in ops_strategy()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger();
            let wallet = ledger.create_wallet(1, None, None).unwrap();

            let mut expected = Decimal::ZERO;
            for (kind, dr_or_cr, amount) in ops {
                let draft = EntryDraft::new(Uuid::new_v4(), kind, dr_or_cr, amount);
                match ledger.record_entry(wallet.uuid, draft).await {
                    Ok(outcome) => {
                        match dr_or_cr {
                            DrOrCr::Credit => expected += amount,
                            DrOrCr::Debit => expected -= amount,
                        }
                        prop_assert_eq!(outcome.wallet.total_balance, expected);
                        prop_assert_eq!(outcome.entry.balance_after, expected);
                    }
                    Err(Error::InsufficientFunds { .. }) => {
                        // Rejected debit must leave the balance untouched
                        let stored = ledger.wallet(wallet.uuid).unwrap();
                        prop_assert_eq!(stored.total_balance, expected);
                    }
                    Err(e) => return Err(TestCaseError::fail(format!("unexpected error: {}", e))),
                }
            }

            let stored = ledger.wallet(wallet.uuid).unwrap();
            prop_assert_eq!(stored.total_balance, expected);
            prop_assert!(stored.total_balance >= Decimal::ZERO);
            prop_assert_eq!(
                stored.total_balance,
                stored.credited_amount - stored.debited_amount
            );
            ledger.check_balance_invariant(wallet.uuid).unwrap();
            Ok(())
        })?;
    }

    /// Property: replaying any entry uuid K extra times changes nothing.
    #[test]
    fn prop_idempotent_replay(amount in amount_strategy(), replays in 1usize..5) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger();
            let wallet = ledger.create_wallet(1, None, None).unwrap();

            let uuid = Uuid::new_v4();
            let draft = EntryDraft::new(uuid, EntryKind::Transaction, DrOrCr::Credit, amount);

            let first = ledger.record_entry(wallet.uuid, draft.clone()).await.unwrap();
            prop_assert!(!first.replayed);

            for _ in 0..replays {
                let outcome = ledger.record_entry(wallet.uuid, draft.clone()).await.unwrap();
                prop_assert!(outcome.replayed);
                prop_assert_eq!(outcome.entry.seq, first.entry.seq);
                prop_assert_eq!(outcome.wallet.total_balance, amount);
            }

            prop_assert_eq!(ledger.wallet_entries(wallet.uuid).unwrap().len(), 1);
            Ok(())
        })?;
    }

    /// Property: N concurrent credits of A yield exactly N*A.
    #[test]
    fn prop_concurrent_credits(n in 1usize..12, amount in amount_strategy()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger();
            let ledger = Arc::new(ledger);
            let wallet = ledger.create_wallet(1, None, None).unwrap();

            let mut handles = Vec::new();
            for _ in 0..n {
                let ledger = ledger.clone();
                let wallet_id = wallet.uuid;
                handles.push(tokio::spawn(async move {
                    let draft = EntryDraft::new(
                        Uuid::new_v4(),
                        EntryKind::Transaction,
                        DrOrCr::Credit,
                        amount,
                    );
                    ledger.record_entry(wallet_id, draft).await
                }));
            }
            for handle in handles {
                handle.await.unwrap().unwrap();
            }

            let stored = ledger.wallet(wallet.uuid).unwrap();
            prop_assert_eq!(stored.total_balance, amount * Decimal::from(n as u64));
            ledger.check_balance_invariant(wallet.uuid).unwrap();
            Ok(())
        })?;
    }

    /// Property: rebuilding from the entry history reproduces the
    /// snapshot exactly (deterministic replay).
    #[test]
    fn prop_rebuild_matches_snapshot(ops in ops_strategy()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger();
            let wallet = ledger.create_wallet(1, None, None).unwrap();

            for (kind, dr_or_cr, amount) in ops {
                let draft = EntryDraft::new(Uuid::new_v4(), kind, dr_or_cr, amount);
                // Rejected debits are fine; they leave no row behind
                let _ = ledger.record_entry(wallet.uuid, draft).await;
            }

            let before = ledger.wallet(wallet.uuid).unwrap();
            let rebuilt = ledger.rebuild_wallet(wallet.uuid).await.unwrap();

            prop_assert_eq!(rebuilt.total_balance, before.total_balance);
            prop_assert_eq!(rebuilt.point_balance, before.point_balance);
            prop_assert_eq!(rebuilt.credited_amount, before.credited_amount);
            prop_assert_eq!(rebuilt.debited_amount, before.debited_amount);
            prop_assert_eq!(rebuilt.locked_balance, before.locked_balance);
            Ok(())
        })?;
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use wallet_core::{EntryStatus, SettlementDetails, SettlementStatus};

    #[tokio::test]
    async fn test_full_offramp_lifecycle() {
        let (ledger, _temp) = create_test_ledger();
        let wallet = ledger.create_wallet(1, None, None).unwrap();

        // Fund the wallet: 100.00
        let fund = EntryDraft::new(
            Uuid::new_v4(),
            EntryKind::Transaction,
            DrOrCr::Credit,
            Decimal::new(10000, 2),
        );
        ledger.record_entry(wallet.uuid, fund).await.unwrap();

        // Offramp debit of 30.00, pending settlement
        let provider_id = Uuid::new_v4();
        let draft = EntryDraft::new(
            provider_id,
            EntryKind::Offramp,
            DrOrCr::Debit,
            Decimal::new(3000, 2),
        )
        .with_settlement(SettlementDetails {
            payment_reference: "yc-seq-77".to_string(),
            payment_channel: "bank-ng".to_string(),
            settlement_status: SettlementStatus::Submitted,
            counterparty: None,
        });

        let outcome = ledger.record_entry(wallet.uuid, draft.clone()).await.unwrap();
        assert_eq!(outcome.wallet.total_balance, Decimal::new(7000, 2));
        assert_eq!(outcome.entry.status, EntryStatus::Pending);

        // Replay of the provider webhook: balance stays at 70.00
        let replay = ledger.record_entry(wallet.uuid, draft).await.unwrap();
        assert!(replay.replayed);
        assert_eq!(replay.wallet.total_balance, Decimal::new(7000, 2));

        // Lookup by gateway sequence id
        let by_ref = ledger.entry_by_reference("yc-seq-77").unwrap();
        assert_eq!(by_ref.uuid, provider_id);

        // Walk the settlement state machine to terminal
        ledger
            .update_settlement_status(provider_id, SettlementStatus::Accepted)
            .await
            .unwrap();
        let settled = ledger
            .update_settlement_status(provider_id, SettlementStatus::Settled)
            .await
            .unwrap();
        assert_eq!(settled.status, EntryStatus::Successful);
    }

    #[tokio::test]
    async fn test_snapshot_repair_after_torn_write() {
        let (ledger, _temp) = create_test_ledger();
        let wallet = ledger.create_wallet(1, None, None).unwrap();

        for _ in 0..5 {
            let draft = EntryDraft::new(
                Uuid::new_v4(),
                EntryKind::Transaction,
                DrOrCr::Credit,
                Decimal::new(1000, 2),
            );
            ledger.record_entry(wallet.uuid, draft).await.unwrap();
        }

        let rebuilt = ledger.rebuild_wallet(wallet.uuid).await.unwrap();
        assert_eq!(rebuilt.total_balance, Decimal::new(5000, 2));
        ledger.check_balance_invariant(wallet.uuid).unwrap();
    }
}
