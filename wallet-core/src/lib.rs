//! Unwind Wallet Core
//!
//! Custodial wallet ledger: cached balance snapshots kept consistent
//! with an append-only entry history under concurrent requests.
//!
//! # Architecture
//!
//! - **Append-only entries**: every balance-affecting event is an
//!   immutable row; archival is a state flag, never a delete
//! - **Single write path**: all balance mutation goes through the
//!   [`mutator::BalanceMutator`], serialized per wallet
//! - **Exact arithmetic**: amounts are `rust_decimal::Decimal`,
//!   never binary floats
//!
//! # Invariants
//!
//! - `total_balance == credited_amount - debited_amount` at all times
//! - `balance_after` on an entry is a write-once audit value
//! - Idempotency: duplicate entry uuids collapse onto one committed row

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod mutator;
pub mod storage;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use mutator::{BalanceMutator, RecordOutcome};
pub use storage::Storage;
pub use types::{
    Counterparty, DrOrCr, EntryDraft, EntryKind, EntryStatus, LedgerEntry, RecordState,
    SettlementDetails, SettlementStatus, Wallet,
};
