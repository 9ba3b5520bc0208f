//! Balance mutation path
//!
//! The [`BalanceMutator`] is the only code path allowed to change a
//! wallet's balance fields. It serializes concurrent writers per wallet
//! with an async mutex table, so operations against different wallets
//! never block each other, and commits the entry row and the wallet row
//! in one storage WriteBatch.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │            Callers (reconciler, controllers)          │
//! └─────────────────────┬────────────────────────────────┘
//!                       │ record_entry(wallet, draft)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               BalanceMutator                          │
//! │  ┌────────────────────────────────────────────────┐  │
//! │  │ per-wallet lock (DashMap<Uuid, Mutex>)         │  │
//! │  │ 1. replay check on draft.uuid                  │  │
//! │  │ 2. load wallet, apply_delta (pure)             │  │
//! │  │ 3. build entry with balance_after              │  │
//! │  └────────────────────────────────────────────────┘  │
//! │                       │                               │
//! │                       ▼                               │
//! │        Storage::record_entry_atomic()                 │
//! │         (one WriteBatch, both rows)                   │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! The lock covers only the local read-modify-write; network calls to the
//! payment gateway happen before the mutator is invoked and never hold a
//! wallet lock.

use crate::{
    metrics::Metrics,
    types::{DrOrCr, EntryDraft, EntryKind, EntryStatus, LedgerEntry, RecordState, Wallet},
    Error, Result, Storage,
};
use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Outcome of a `record_entry` call
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    /// The committed (or previously committed, on replay) entry
    pub entry: LedgerEntry,
    /// Wallet snapshot after the entry was applied
    pub wallet: Wallet,
    /// True when the call collapsed onto an already-committed entry
    pub replayed: bool,
}

/// Sole writer of wallet balance fields
pub struct BalanceMutator {
    /// Storage backend
    storage: Arc<Storage>,

    /// Per-wallet write locks
    locks: DashMap<Uuid, Arc<Mutex<()>>>,

    /// Metrics collector
    metrics: Metrics,
}

impl std::fmt::Debug for BalanceMutator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BalanceMutator")
            .field("storage", &self.storage)
            .field("locked_wallets", &self.locks.len())
            .finish_non_exhaustive()
    }
}

impl BalanceMutator {
    /// Create new mutator
    pub fn new(storage: Arc<Storage>, metrics: Metrics) -> Self {
        Self {
            storage,
            locks: DashMap::new(),
            metrics,
        }
    }

    fn wallet_lock(&self, wallet_id: Uuid) -> Arc<Mutex<()>> {
        self.locks
            .entry(wallet_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Record one ledger entry against a wallet.
    ///
    /// Idempotent: a draft whose `uuid` is already committed is a no-op
    /// that returns the stored entry and the current wallet (gateway
    /// webhooks are delivered at least once).
    pub async fn record_entry(&self, wallet_id: Uuid, draft: EntryDraft) -> Result<RecordOutcome> {
        let lock = self.wallet_lock(wallet_id);
        let _guard = lock.lock().await;
        let started = std::time::Instant::now();

        // Replay check under the lock, so a concurrent duplicate cannot
        // slip between check and commit.
        if let Some(existing) = self.storage.find_entry(draft.uuid)? {
            // Only a true replay collapses; a reused uuid carrying a
            // different mutation is a caller bug.
            if existing.kind != draft.kind
                || existing.dr_or_cr != draft.dr_or_cr
                || existing.amount != draft.amount
            {
                return Err(Error::DuplicateEntry(format!(
                    "entry {} already committed with a different kind, direction, or amount",
                    draft.uuid
                )));
            }
            tracing::info!(
                entry = %draft.uuid,
                wallet = %wallet_id,
                "Idempotent replay, returning committed entry"
            );
            self.metrics.record_replay();
            let wallet = self.storage.get_wallet(wallet_id)?;
            return Ok(RecordOutcome {
                entry: existing,
                wallet,
                replayed: true,
            });
        }

        if draft.hold && draft.dr_or_cr != DrOrCr::Debit {
            return Err(Error::InvalidEntry(
                "Withdrawal holds apply only to debits".to_string(),
            ));
        }

        let wallet = self.storage.get_wallet(wallet_id)?;

        let mut next_wallet = match wallet.apply_delta(
            draft.kind,
            draft.dr_or_cr,
            draft.amount,
            draft.allow_negative,
        ) {
            Ok(w) => w,
            Err(e) => {
                if matches!(e, Error::InsufficientFunds { .. }) {
                    self.metrics.record_insufficient_funds();
                }
                return Err(e);
            }
        };

        if draft.hold {
            // In-flight withdrawal: tracked until the settlement reaches
            // a terminal state.
            next_wallet.locked_balance += draft.amount;
        }

        let now = Utc::now();
        let mut entry = LedgerEntry {
            uuid: draft.uuid,
            seq: 0, // assigned by storage
            wallet_id,
            user_id: wallet.user_id,
            kind: draft.kind,
            dr_or_cr: draft.dr_or_cr,
            amount: draft.amount,
            hold: draft.hold,
            balance_after: next_wallet.balance_for(draft.kind),
            status: draft.status,
            state: RecordState::Active,
            reference: draft.reference,
            charge_id: draft.charge_id,
            chargeable_type: draft.chargeable_type,
            description: draft.description,
            currency: draft.currency.unwrap_or_else(|| wallet.currency.clone()),
            gateway: draft.gateway.unwrap_or_else(|| "unwind-wallet".to_string()),
            extra_data: draft.extra_data,
            settlement: draft.settlement,
            created_at: now,
            updated_at: now,
        };

        self.storage.record_entry_atomic(&mut entry, &next_wallet)?;

        self.metrics.record_entry(draft.kind);
        self.metrics
            .record_duration(started.elapsed().as_secs_f64());

        Ok(RecordOutcome {
            entry,
            wallet: next_wallet,
            replayed: false,
        })
    }

    /// Transition an entry's processing status
    pub async fn update_entry_status(&self, entry_id: Uuid, status: EntryStatus) -> Result<LedgerEntry> {
        // Status updates do not touch balances, but they share the wallet
        // lock so they cannot interleave with a balance write on the same
        // entry's wallet.
        let mut entry = self.storage.get_entry(entry_id)?;
        let lock = self.wallet_lock(entry.wallet_id);
        let _guard = lock.lock().await;

        entry = self.storage.get_entry(entry_id)?;
        entry.status = status;
        entry.updated_at = Utc::now();
        self.storage.put_entry(&entry)?;

        tracing::debug!(entry = %entry_id, status = ?status, "Entry status updated");
        Ok(entry)
    }

    /// Transition a settlement entry's state-machine position.
    ///
    /// Fails with `InvalidStateTransition` for any move out of a
    /// terminal state or along an illegal edge.
    pub async fn update_settlement_status(
        &self,
        entry_id: Uuid,
        next: crate::types::SettlementStatus,
    ) -> Result<LedgerEntry> {
        let probe = self.storage.get_entry(entry_id)?;
        let lock = self.wallet_lock(probe.wallet_id);
        let _guard = lock.lock().await;

        let mut entry = self.storage.get_entry(entry_id)?;
        let settlement = entry
            .settlement
            .as_mut()
            .ok_or_else(|| Error::InvalidEntry(format!("Entry {} has no settlement", entry_id)))?;

        if !settlement.settlement_status.can_transition_to(next) {
            return Err(Error::InvalidStateTransition {
                from: settlement.settlement_status.to_string(),
                to: next.to_string(),
            });
        }

        let from = settlement.settlement_status;
        settlement.settlement_status = next;
        entry.status = match next {
            crate::types::SettlementStatus::Settled => EntryStatus::Successful,
            _ => EntryStatus::Pending,
        };
        entry.updated_at = Utc::now();
        self.storage.put_entry(&entry)?;

        if entry.hold && next.is_terminal() {
            // The withdrawal is no longer in flight, release the hold.
            let mut wallet = self.storage.get_wallet(entry.wallet_id)?;
            wallet.locked_balance -= entry.amount;
            wallet.updated_at = Utc::now();
            self.storage.put_wallet(&wallet)?;
        }

        tracing::info!(
            entry = %entry_id,
            from = %from,
            to = %next,
            "Settlement status transitioned"
        );
        Ok(entry)
    }

    /// Archive an entry (soft delete)
    pub async fn archive_entry(&self, entry_id: Uuid) -> Result<LedgerEntry> {
        let probe = self.storage.get_entry(entry_id)?;
        let lock = self.wallet_lock(probe.wallet_id);
        let _guard = lock.lock().await;

        let mut entry = self.storage.get_entry(entry_id)?;
        entry.state = RecordState::Archived;
        entry.updated_at = Utc::now();
        self.storage.put_entry(&entry)?;
        Ok(entry)
    }

    /// Archive a wallet and cascade-archive its entries
    pub async fn archive_wallet(&self, wallet_id: Uuid) -> Result<Wallet> {
        let lock = self.wallet_lock(wallet_id);
        let _guard = lock.lock().await;

        let mut wallet = self.storage.get_wallet(wallet_id)?;
        wallet.state = RecordState::Archived;
        wallet.updated_at = Utc::now();
        self.storage.put_wallet(&wallet)?;

        for mut entry in self.storage.get_wallet_entries(wallet_id)? {
            if entry.state == RecordState::Active {
                entry.state = RecordState::Archived;
                entry.updated_at = Utc::now();
                self.storage.put_entry(&entry)?;
            }
        }

        tracing::info!(wallet = %wallet_id, "Wallet archived");
        Ok(wallet)
    }

    /// Rebuild wallet balances from the entry history and persist the
    /// result. This is the repair path: if a crash ever left the cached
    /// snapshot behind the entry log, replaying the log restores it.
    pub async fn rebuild_wallet(&self, wallet_id: Uuid) -> Result<Wallet> {
        let lock = self.wallet_lock(wallet_id);
        let _guard = lock.lock().await;

        let stored = self.storage.get_wallet(wallet_id)?;
        let entries = self.storage.get_wallet_entries(wallet_id)?;

        let mut rebuilt = Wallet::new(stored.uuid, stored.user_id, stored.currency.clone());
        rebuilt.seq = stored.seq;
        rebuilt.wallet_account = stored.wallet_account.clone();
        rebuilt.cash_per_point = stored.cash_per_point;
        rebuilt.created_at = stored.created_at;

        for entry in &entries {
            // Replay permits negatives: history already passed validation
            rebuilt = rebuilt.apply_delta(entry.kind, entry.dr_or_cr, entry.amount, true)?;
            let hold_open = entry
                .settlement
                .as_ref()
                .map_or(true, |s| !s.settlement_status.is_terminal());
            if entry.hold && hold_open {
                rebuilt.locked_balance += entry.amount;
            }
        }

        // Applied after the replay so archived wallets stay repairable
        rebuilt.state = stored.state;

        if rebuilt.total_balance != stored.total_balance
            || rebuilt.point_balance != stored.point_balance
        {
            tracing::warn!(
                wallet = %wallet_id,
                stored_total = %stored.total_balance,
                rebuilt_total = %rebuilt.total_balance,
                "Wallet snapshot diverged from entry history, repairing"
            );
        }

        self.storage.put_wallet(&rebuilt)?;
        Ok(rebuilt)
    }

    /// Check the conservation invariant against the entry history
    pub fn check_balance_invariant(&self, wallet_id: Uuid) -> Result<()> {
        let wallet = self.storage.get_wallet(wallet_id)?;

        if !wallet.invariant_holds() {
            return Err(Error::InvariantViolation(format!(
                "wallet {}: total {} != credited {} - debited {}",
                wallet_id, wallet.total_balance, wallet.credited_amount, wallet.debited_amount
            )));
        }

        let entries = self.storage.get_wallet_entries(wallet_id)?;
        let mut total = Decimal::ZERO;
        for entry in &entries {
            if entry.kind == EntryKind::Point {
                continue;
            }
            match entry.dr_or_cr {
                DrOrCr::Credit => total += entry.amount,
                DrOrCr::Debit => total -= entry.amount,
            }
        }

        if total != wallet.total_balance {
            return Err(Error::InvariantViolation(format!(
                "wallet {}: entry history sums to {}, snapshot says {}",
                wallet_id, total, wallet.total_balance
            )));
        }

        Ok(())
    }
}
