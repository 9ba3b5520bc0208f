//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `wallets` - Wallet snapshots (key: wallet uuid)
//! - `entries` - Append-only ledger entries (key: entry uuid)
//! - `indices` - Secondary indices for fast lookups
//! - `meta` - Monotonic sequence counters
//!
//! # Index layout
//!
//! - `u:` || user_id (be)            -> wallet uuid
//! - `w:` || wallet uuid || seq (be) -> entry uuid (history, apply order)
//! - `r:` || payment_reference       -> entry uuid (get-by-sequence)

use crate::{
    error::{Error, Result},
    types::{LedgerEntry, Wallet},
    Config,
};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, IteratorMode, Options, WriteBatch, DB,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
const CF_WALLETS: &str = "wallets";
const CF_ENTRIES: &str = "entries";
const CF_INDICES: &str = "indices";
const CF_META: &str = "meta";

const META_WALLET_SEQ: &[u8] = b"wallet_seq";
const META_ENTRY_SEQ: &[u8] = b"entry_seq";

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,

    // In-memory heads of the persisted counters. Every insert bumps the
    // atomic and writes the new value in the same WriteBatch.
    wallet_seq: AtomicU64,
    entry_seq: AtomicU64,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("wallet_seq", &self.wallet_seq)
            .field("entry_seq", &self.entry_seq)
            .finish_non_exhaustive()
    }
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_target_file_size_base(config.rocksdb.target_file_size_mb * 1024 * 1024);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        // Universal compaction for write-heavy workload
        db_opts.set_compaction_style(DBCompactionStyle::Universal);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_WALLETS, Self::cf_options_wallets()),
            ColumnFamilyDescriptor::new(CF_ENTRIES, Self::cf_options_entries()),
            ColumnFamilyDescriptor::new(CF_INDICES, Self::cf_options_indices()),
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        let wallet_seq = Self::load_counter(&db, META_WALLET_SEQ)?;
        let entry_seq = Self::load_counter(&db, META_ENTRY_SEQ)?;

        tracing::info!(
            path = ?path,
            wallet_seq,
            entry_seq,
            "Opened wallet store"
        );

        Ok(Self {
            db: Arc::new(db),
            wallet_seq: AtomicU64::new(wallet_seq),
            entry_seq: AtomicU64::new(entry_seq),
        })
    }

    fn load_counter(db: &DB, key: &[u8]) -> Result<u64> {
        let cf = db
            .cf_handle(CF_META)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", CF_META)))?;
        let value = db.get_cf(cf, key)?;
        Ok(match value {
            Some(bytes) if bytes.len() == 8 => u64::from_be_bytes(bytes[..8].try_into().unwrap()),
            _ => 0,
        })
    }

    // Column family options

    fn cf_options_wallets() -> Options {
        let mut opts = Options::default();
        // Wallets are frequently read, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_entries() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_indices() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        // Indices benefit from bloom filters
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Wallet operations

    /// Create a wallet, enforcing the unique user_id constraint.
    /// Assigns the surrogate `seq` on insert.
    pub fn create_wallet(&self, wallet: &mut Wallet) -> Result<()> {
        let cf_wallets = self.cf_handle(CF_WALLETS)?;
        let cf_indices = self.cf_handle(CF_INDICES)?;
        let cf_meta = self.cf_handle(CF_META)?;

        let user_key = Self::index_key_user(wallet.user_id);
        if self.db.get_cf(cf_indices, &user_key)?.is_some() {
            return Err(Error::WalletExists(wallet.user_id));
        }

        wallet.seq = self.wallet_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let mut batch = WriteBatch::default();
        batch.put_cf(cf_wallets, wallet.uuid.as_bytes(), bincode::serialize(wallet)?);
        batch.put_cf(cf_indices, &user_key, wallet.uuid.as_bytes());
        batch.put_cf(cf_meta, META_WALLET_SEQ, wallet.seq.to_be_bytes());
        self.db.write(batch)?;

        tracing::info!(
            wallet = %wallet.uuid,
            user_id = wallet.user_id,
            currency = %wallet.currency,
            "Wallet created"
        );

        Ok(())
    }

    /// Get wallet by uuid
    pub fn get_wallet(&self, wallet_id: Uuid) -> Result<Wallet> {
        let cf = self.cf_handle(CF_WALLETS)?;
        let value = self
            .db
            .get_cf(cf, wallet_id.as_bytes())?
            .ok_or_else(|| Error::WalletNotFound(wallet_id.to_string()))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// Get wallet by owning user (unique 1:1 index)
    pub fn get_wallet_by_user(&self, user_id: u64) -> Result<Wallet> {
        let cf_indices = self.cf_handle(CF_INDICES)?;
        let value = self
            .db
            .get_cf(cf_indices, Self::index_key_user(user_id))?
            .ok_or_else(|| Error::WalletNotFound(format!("user {}", user_id)))?;

        let uuid_bytes: [u8; 16] = value
            .as_slice()
            .try_into()
            .map_err(|_| Error::Storage("Corrupt user index entry".to_string()))?;
        self.get_wallet(Uuid::from_bytes(uuid_bytes))
    }

    /// Overwrite a wallet snapshot (status/archival updates)
    pub fn put_wallet(&self, wallet: &Wallet) -> Result<()> {
        let cf = self.cf_handle(CF_WALLETS)?;
        self.db
            .put_cf(cf, wallet.uuid.as_bytes(), bincode::serialize(wallet)?)?;
        Ok(())
    }

    // Entry operations

    /// Get entry by idempotency key
    pub fn get_entry(&self, entry_id: Uuid) -> Result<LedgerEntry> {
        let cf = self.cf_handle(CF_ENTRIES)?;
        let value = self
            .db
            .get_cf(cf, entry_id.as_bytes())?
            .ok_or_else(|| Error::EntryNotFound(entry_id.to_string()))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// Look up an entry without treating absence as an error
    pub fn find_entry(&self, entry_id: Uuid) -> Result<Option<LedgerEntry>> {
        let cf = self.cf_handle(CF_ENTRIES)?;
        match self.db.get_cf(cf, entry_id.as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Get a settlement entry by gateway sequence id
    pub fn get_entry_by_reference(&self, reference: &str) -> Result<LedgerEntry> {
        let cf_indices = self.cf_handle(CF_INDICES)?;
        let value = self
            .db
            .get_cf(cf_indices, Self::index_key_reference(reference))?
            .ok_or_else(|| Error::EntryNotFound(reference.to_string()))?;

        let uuid_bytes: [u8; 16] = value
            .as_slice()
            .try_into()
            .map_err(|_| Error::Storage("Corrupt reference index entry".to_string()))?;
        self.get_entry(Uuid::from_bytes(uuid_bytes))
    }

    /// Insert a ledger entry and the updated wallet snapshot atomically.
    ///
    /// This is the commit point for balance mutation: entry row, wallet
    /// row, and indices land in one WriteBatch, so a crash can never leave
    /// the entry and the wallet out of sync.
    pub fn record_entry_atomic(&self, entry: &mut LedgerEntry, wallet: &Wallet) -> Result<()> {
        let cf_entries = self.cf_handle(CF_ENTRIES)?;
        let cf_wallets = self.cf_handle(CF_WALLETS)?;
        let cf_indices = self.cf_handle(CF_INDICES)?;
        let cf_meta = self.cf_handle(CF_META)?;

        entry.seq = self.entry_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let mut batch = WriteBatch::default();

        batch.put_cf(cf_entries, entry.uuid.as_bytes(), bincode::serialize(entry)?);
        batch.put_cf(cf_wallets, wallet.uuid.as_bytes(), bincode::serialize(wallet)?);
        batch.put_cf(
            cf_indices,
            Self::index_key_wallet_entry(&entry.wallet_id, entry.seq),
            entry.uuid.as_bytes(),
        );
        if let Some(ref settlement) = entry.settlement {
            batch.put_cf(
                cf_indices,
                Self::index_key_reference(&settlement.payment_reference),
                entry.uuid.as_bytes(),
            );
        }
        batch.put_cf(cf_meta, META_ENTRY_SEQ, entry.seq.to_be_bytes());

        self.db.write(batch)?;

        tracing::debug!(
            entry = %entry.uuid,
            wallet = %wallet.uuid,
            kind = %entry.kind,
            dr_or_cr = %entry.dr_or_cr,
            amount = %entry.amount,
            balance_after = %entry.balance_after,
            "Entry committed"
        );

        Ok(())
    }

    /// Overwrite an entry (status transition or archival only; the audit
    /// fields are never rewritten by callers)
    pub fn put_entry(&self, entry: &LedgerEntry) -> Result<()> {
        let cf = self.cf_handle(CF_ENTRIES)?;
        self.db
            .put_cf(cf, entry.uuid.as_bytes(), bincode::serialize(entry)?)?;
        Ok(())
    }

    /// Get all entries of a wallet in apply order
    pub fn get_wallet_entries(&self, wallet_id: Uuid) -> Result<Vec<LedgerEntry>> {
        let cf_indices = self.cf_handle(CF_INDICES)?;

        let prefix = Self::index_key_wallet_entry_prefix(&wallet_id);
        let iter = self.db.prefix_iterator_cf(cf_indices, &prefix);

        let mut entries = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }

            let uuid_bytes: [u8; 16] = value
                .as_ref()
                .try_into()
                .map_err(|_| Error::Storage("Corrupt wallet-entry index".to_string()))?;
            entries.push(self.get_entry(Uuid::from_bytes(uuid_bytes))?);
        }

        Ok(entries)
    }

    // Index key helpers

    fn index_key_user(user_id: u64) -> Vec<u8> {
        let mut key = b"u:".to_vec();
        key.extend_from_slice(&user_id.to_be_bytes());
        key
    }

    fn index_key_wallet_entry_prefix(wallet_id: &Uuid) -> Vec<u8> {
        let mut key = b"w:".to_vec();
        key.extend_from_slice(wallet_id.as_bytes());
        key
    }

    fn index_key_wallet_entry(wallet_id: &Uuid, seq: u64) -> Vec<u8> {
        let mut key = Self::index_key_wallet_entry_prefix(wallet_id);
        key.extend_from_slice(&seq.to_be_bytes());
        key
    }

    fn index_key_reference(reference: &str) -> Vec<u8> {
        let mut key = b"r:".to_vec();
        key.extend_from_slice(reference.as_bytes());
        key
    }

    // Statistics

    /// Get storage statistics
    pub fn get_stats(&self) -> Result<StorageStats> {
        let cf_wallets = self.cf_handle(CF_WALLETS)?;
        let cf_entries = self.cf_handle(CF_ENTRIES)?;

        let mut wallet_count = 0u64;
        let iter = self.db.iterator_cf(cf_wallets, IteratorMode::Start);
        for _ in iter {
            wallet_count += 1;
        }

        let entry_count = self
            .db
            .property_int_value_cf(cf_entries, "rocksdb.estimate-num-keys")?
            .unwrap_or(0);

        Ok(StorageStats {
            total_wallets: wallet_count,
            total_entries: entry_count,
        })
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("Wallet store closed gracefully");
        Ok(())
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// Number of wallets
    pub total_wallets: u64,
    /// Approximate number of ledger entries
    pub total_entries: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DrOrCr, EntryDraft, EntryKind, EntryStatus, RecordState, Wallet};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn test_config() -> (Config, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (config, temp_dir)
    }

    fn test_entry(wallet: &Wallet) -> LedgerEntry {
        let draft = EntryDraft::new(
            Uuid::new_v4(),
            EntryKind::Transaction,
            DrOrCr::Credit,
            Decimal::new(10000, 2),
        );
        LedgerEntry {
            uuid: draft.uuid,
            seq: 0,
            wallet_id: wallet.uuid,
            user_id: wallet.user_id,
            kind: draft.kind,
            dr_or_cr: draft.dr_or_cr,
            amount: draft.amount,
            hold: false,
            balance_after: Decimal::new(10000, 2),
            status: EntryStatus::Default,
            state: RecordState::Active,
            reference: None,
            charge_id: None,
            chargeable_type: None,
            description: None,
            currency: "USDC".to_string(),
            gateway: "unwind-wallet".to_string(),
            extra_data: Default::default(),
            settlement: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_storage_open() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();
        assert!(storage.db.cf_handle(CF_WALLETS).is_some());
        assert!(storage.db.cf_handle(CF_ENTRIES).is_some());
    }

    #[test]
    fn test_create_and_get_wallet() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let mut wallet = Wallet::new(Uuid::new_v4(), 42, "USDC");
        storage.create_wallet(&mut wallet).unwrap();
        assert_eq!(wallet.seq, 1);

        let by_uuid = storage.get_wallet(wallet.uuid).unwrap();
        assert_eq!(by_uuid.user_id, 42);

        let by_user = storage.get_wallet_by_user(42).unwrap();
        assert_eq!(by_user.uuid, wallet.uuid);
    }

    #[test]
    fn test_unique_user_constraint() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let mut first = Wallet::new(Uuid::new_v4(), 7, "USDC");
        storage.create_wallet(&mut first).unwrap();

        let mut second = Wallet::new(Uuid::new_v4(), 7, "USDC");
        let result = storage.create_wallet(&mut second);
        assert!(matches!(result, Err(Error::WalletExists(7))));
    }

    #[test]
    fn test_atomic_record() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let mut wallet = Wallet::new(Uuid::new_v4(), 1, "USDC");
        storage.create_wallet(&mut wallet).unwrap();

        let mut entry = test_entry(&wallet);
        wallet.total_balance = Decimal::new(10000, 2);
        wallet.credited_amount = Decimal::new(10000, 2);
        storage.record_entry_atomic(&mut entry, &wallet).unwrap();

        let stored_entry = storage.get_entry(entry.uuid).unwrap();
        assert_eq!(stored_entry.amount, entry.amount);

        let stored_wallet = storage.get_wallet(wallet.uuid).unwrap();
        assert_eq!(stored_wallet.total_balance, Decimal::new(10000, 2));
    }

    #[test]
    fn test_wallet_entries_ordered() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let mut wallet = Wallet::new(Uuid::new_v4(), 1, "USDC");
        storage.create_wallet(&mut wallet).unwrap();

        for _ in 0..3 {
            let mut entry = test_entry(&wallet);
            storage.record_entry_atomic(&mut entry, &wallet).unwrap();
        }

        let entries = storage.get_wallet_entries(wallet.uuid).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.windows(2).all(|w| w[0].seq < w[1].seq));
    }

    #[test]
    fn test_reference_lookup() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let mut wallet = Wallet::new(Uuid::new_v4(), 1, "USDC");
        storage.create_wallet(&mut wallet).unwrap();

        let mut entry = test_entry(&wallet);
        entry.settlement = Some(crate::types::SettlementDetails {
            payment_reference: "seq-123".to_string(),
            payment_channel: "bank-ng".to_string(),
            settlement_status: crate::types::SettlementStatus::Submitted,
            counterparty: None,
        });
        storage.record_entry_atomic(&mut entry, &wallet).unwrap();

        let found = storage.get_entry_by_reference("seq-123").unwrap();
        assert_eq!(found.uuid, entry.uuid);

        let missing = storage.get_entry_by_reference("seq-999");
        assert!(matches!(missing, Err(Error::EntryNotFound(_))));
    }

    #[test]
    fn test_seq_counter_survives_reopen() {
        let (config, _temp) = test_config();
        {
            let storage = Storage::open(&config).unwrap();
            let mut wallet = Wallet::new(Uuid::new_v4(), 1, "USDC");
            storage.create_wallet(&mut wallet).unwrap();
            let mut entry = test_entry(&wallet);
            storage.record_entry_atomic(&mut entry, &wallet).unwrap();
            assert_eq!(entry.seq, 1);
            storage.close().unwrap();
        }

        let storage = Storage::open(&config).unwrap();
        assert_eq!(storage.entry_seq.load(Ordering::SeqCst), 1);
        assert_eq!(storage.wallet_seq.load(Ordering::SeqCst), 1);
    }
}
