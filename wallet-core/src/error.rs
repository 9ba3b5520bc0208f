//! Error types for the wallet ledger

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Malformed or incomplete entry input
    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    /// Wallet not found
    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    /// Entry not found
    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    /// A wallet already exists for this user
    #[error("Wallet already exists for user: {0}")]
    WalletExists(u64),

    /// Idempotency-key collision: an entry with this uuid is already
    /// committed. Replays are collapsed by the mutator; this surfaces
    /// only when the stored entry conflicts with the draft.
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Debit would drive a non-overdraft balance negative
    #[error("Insufficient funds in wallet {wallet}: requested {requested}, available {available}")]
    InsufficientFunds {
        /// Wallet UUID
        wallet: String,
        /// Requested debit amount
        requested: Decimal,
        /// Available balance
        available: Decimal,
    },

    /// Mutation attempted on an archived wallet
    #[error("Wallet archived: {0}")]
    WalletArchived(String),

    /// Illegal settlement state-machine transition
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition {
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// Invariant violation (balance conservation, etc.)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
