//! Main ledger orchestration layer
//!
//! This module ties together storage, the balance mutator, and metrics
//! into a high-level API for wallet operations.
//!
//! # Example
//!
//! ```no_run
//! use wallet_core::{Config, Ledger};
//!
//! #[tokio::main]
//! async fn main() -> wallet_core::Result<()> {
//!     let config = Config::default();
//!     let ledger = Ledger::open(config)?;
//!
//!     let wallet = ledger.create_wallet(42, None, None)?;
//!
//!     // Record a credit
//!     // let outcome = ledger.record_entry(wallet.uuid, draft).await?;
//!
//!     Ok(())
//! }
//! ```

use crate::{
    metrics::Metrics,
    mutator::{BalanceMutator, RecordOutcome},
    types::{EntryDraft, EntryStatus, LedgerEntry, SettlementStatus, Wallet},
    Config, Result, Storage,
};
use std::sync::Arc;
use uuid::Uuid;

/// Main wallet-ledger interface
pub struct Ledger {
    /// Direct storage access (for reads)
    storage: Arc<Storage>,

    /// The single write path for balances
    mutator: BalanceMutator,

    /// Metrics collector
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Ledger {
    /// Open ledger with configuration
    pub fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config)?);
        let metrics = Metrics::new()
            .map_err(|e| crate::Error::Config(format!("Failed to create metrics: {}", e)))?;
        let mutator = BalanceMutator::new(storage.clone(), metrics.clone());

        Ok(Self {
            storage,
            mutator,
            metrics,
            config,
        })
    }

    /// Provision a wallet for a user (1:1, unique user_id)
    pub fn create_wallet(
        &self,
        user_id: u64,
        uuid: Option<Uuid>,
        currency: Option<String>,
    ) -> Result<Wallet> {
        let mut wallet = Wallet::new(
            uuid.unwrap_or_else(Uuid::new_v4),
            user_id,
            currency.unwrap_or_else(|| self.config.default_currency.clone()),
        );
        self.storage.create_wallet(&mut wallet)?;
        self.metrics.record_wallet_created();
        Ok(wallet)
    }

    /// Record one balance-affecting entry
    pub async fn record_entry(&self, wallet_id: Uuid, draft: EntryDraft) -> Result<RecordOutcome> {
        self.mutator.record_entry(wallet_id, draft).await
    }

    /// Get wallet by uuid
    pub fn wallet(&self, wallet_id: Uuid) -> Result<Wallet> {
        self.storage.get_wallet(wallet_id)
    }

    /// Get wallet by owning user
    pub fn wallet_by_user(&self, user_id: u64) -> Result<Wallet> {
        self.storage.get_wallet_by_user(user_id)
    }

    /// Get entry by idempotency key
    pub fn entry(&self, entry_id: Uuid) -> Result<LedgerEntry> {
        self.storage.get_entry(entry_id)
    }

    /// Get a settlement entry by gateway sequence id
    pub fn entry_by_reference(&self, reference: &str) -> Result<LedgerEntry> {
        self.storage.get_entry_by_reference(reference)
    }

    /// Get all entries of a wallet in apply order
    pub fn wallet_entries(&self, wallet_id: Uuid) -> Result<Vec<LedgerEntry>> {
        self.storage.get_wallet_entries(wallet_id)
    }

    /// Mark an entry settled/successful
    pub async fn settle_entry(&self, entry_id: Uuid) -> Result<LedgerEntry> {
        self.mutator
            .update_entry_status(entry_id, EntryStatus::Successful)
            .await
    }

    /// Transition an entry's processing status
    pub async fn update_entry_status(
        &self,
        entry_id: Uuid,
        status: EntryStatus,
    ) -> Result<LedgerEntry> {
        self.mutator.update_entry_status(entry_id, status).await
    }

    /// Transition a settlement entry's state-machine position
    pub async fn update_settlement_status(
        &self,
        entry_id: Uuid,
        next: SettlementStatus,
    ) -> Result<LedgerEntry> {
        self.mutator.update_settlement_status(entry_id, next).await
    }

    /// Soft-delete an entry
    pub async fn archive_entry(&self, entry_id: Uuid) -> Result<LedgerEntry> {
        self.mutator.archive_entry(entry_id).await
    }

    /// Soft-delete a wallet, cascade-archiving its entries
    pub async fn archive_wallet(&self, wallet_id: Uuid) -> Result<Wallet> {
        self.mutator.archive_wallet(wallet_id).await
    }

    /// Recompute wallet balances from the entry history (repair path)
    pub async fn rebuild_wallet(&self, wallet_id: Uuid) -> Result<Wallet> {
        self.mutator.rebuild_wallet(wallet_id).await
    }

    /// Check the conservation invariant for one wallet
    pub fn check_balance_invariant(&self, wallet_id: Uuid) -> Result<()> {
        self.mutator.check_balance_invariant(wallet_id)
    }

    /// Metrics registry for scraping
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Storage statistics
    pub fn stats(&self) -> Result<crate::storage::StorageStats> {
        self.storage.get_stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DrOrCr, EntryKind};
    use rust_decimal::Decimal;

    fn create_test_ledger() -> (Ledger, tempfile::TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (Ledger::open(config).unwrap(), temp_dir)
    }

    #[tokio::test]
    async fn test_ledger_open_and_create_wallet() {
        let (ledger, _temp) = create_test_ledger();
        let wallet = ledger.create_wallet(42, None, None).unwrap();
        assert_eq!(wallet.currency, "USDC");

        let found = ledger.wallet_by_user(42).unwrap();
        assert_eq!(found.uuid, wallet.uuid);
    }

    #[tokio::test]
    async fn test_record_and_settle() {
        let (ledger, _temp) = create_test_ledger();
        let wallet = ledger.create_wallet(1, None, None).unwrap();

        let draft = EntryDraft::new(
            Uuid::new_v4(),
            EntryKind::Transaction,
            DrOrCr::Credit,
            Decimal::new(10000, 2),
        )
        .with_description("signup bonus");
        let outcome = ledger.record_entry(wallet.uuid, draft).await.unwrap();
        assert_eq!(outcome.entry.status, EntryStatus::Default);

        let settled = ledger.settle_entry(outcome.entry.uuid).await.unwrap();
        assert_eq!(settled.status, EntryStatus::Successful);

        // The audit snapshot is untouched by the status transition
        assert_eq!(settled.balance_after, Decimal::new(10000, 2));
    }

    #[tokio::test]
    async fn test_entry_history() {
        let (ledger, _temp) = create_test_ledger();
        let wallet = ledger.create_wallet(1, None, None).unwrap();

        for i in 1..=3u32 {
            let draft = EntryDraft::new(
                Uuid::new_v4(),
                EntryKind::Transaction,
                DrOrCr::Credit,
                Decimal::from(i),
            );
            ledger.record_entry(wallet.uuid, draft).await.unwrap();
        }

        let entries = ledger.wallet_entries(wallet.uuid).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].balance_after, Decimal::from(6u32));
        ledger.check_balance_invariant(wallet.uuid).unwrap();
    }
}
