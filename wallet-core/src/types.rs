//! Core types for the wallet ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Exact arithmetic (Decimal for money, never binary float)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Lifecycle state shared by wallets and ledger entries.
///
/// Rows are archived (soft-deleted), never hard-deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum RecordState {
    /// Live row
    Active = 1,
    /// Soft-deleted row
    Archived = 2,
}

/// Ledger entry processing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum EntryStatus {
    /// Freshly recorded, no external settlement attached
    Default = 1,
    /// Awaiting external settlement
    Pending = 2,
    /// Settled / confirmed
    Successful = 3,
}

/// Direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum DrOrCr {
    /// Increases the balance
    Credit = 1,
    /// Decreases the balance
    Debit = 2,
}

impl fmt::Display for DrOrCr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrOrCr::Credit => write!(f, "credit"),
            DrOrCr::Debit => write!(f, "debit"),
        }
    }
}

/// Kind of ledger entry (tagged variant instead of parallel row types)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EntryKind {
    /// Cash transaction against `total_balance`
    Transaction = 1,
    /// Loyalty-point transaction against `point_balance`
    Point = 2,
    /// External deposit (always a credit)
    Onramp = 3,
    /// External withdrawal (always a debit)
    Offramp = 4,
}

impl EntryKind {
    /// Direction fixed by kind, if any.
    ///
    /// On/off-ramps carry a fixed direction; plain transactions may be
    /// either.
    pub fn fixed_direction(&self) -> Option<DrOrCr> {
        match self {
            EntryKind::Onramp => Some(DrOrCr::Credit),
            EntryKind::Offramp => Some(DrOrCr::Debit),
            _ => None,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryKind::Transaction => "transaction",
            EntryKind::Point => "point",
            EntryKind::Onramp => "onramp",
            EntryKind::Offramp => "offramp",
        };
        write!(f, "{}", s)
    }
}

/// External-settlement state machine
///
/// Success path: `Submitted -> Accepted -> Settled`.
/// Failure/compensation paths: `Submitted -> Denied`,
/// `Accepted -> Cancelled`, `Accepted -> Refunded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SettlementStatus {
    /// Submitted to the gateway, outcome pending
    Submitted = 1,
    /// Accepted by the gateway
    Accepted = 2,
    /// Funds settled (terminal)
    Settled = 3,
    /// Denied by the gateway (terminal)
    Denied = 4,
    /// Cancelled after acceptance (terminal)
    Cancelled = 5,
    /// Refunded after acceptance (terminal)
    Refunded = 6,
}

impl SettlementStatus {
    /// Check whether no further transitions are permitted
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SettlementStatus::Settled
                | SettlementStatus::Denied
                | SettlementStatus::Cancelled
                | SettlementStatus::Refunded
        )
    }

    /// Check whether a transition to `next` is legal
    pub fn can_transition_to(&self, next: SettlementStatus) -> bool {
        use SettlementStatus::*;
        matches!(
            (self, next),
            (Submitted, Accepted)
                | (Submitted, Denied)
                | (Accepted, Settled)
                | (Accepted, Cancelled)
                | (Accepted, Refunded)
        )
    }
}

impl fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SettlementStatus::Submitted => "submitted",
            SettlementStatus::Accepted => "accepted",
            SettlementStatus::Settled => "settled",
            SettlementStatus::Denied => "denied",
            SettlementStatus::Cancelled => "cancelled",
            SettlementStatus::Refunded => "refunded",
        };
        write!(f, "{}", s)
    }
}

/// Per-user balance snapshot derived from the entry history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    /// Externally-visible wallet ID
    pub uuid: Uuid,

    /// Surrogate store sequence (monotonic, assigned on insert)
    pub seq: u64,

    /// Owning user (unique, 1:1)
    pub user_id: u64,

    /// Cash balance. Invariant: `credited_amount - debited_amount`
    pub total_balance: Decimal,

    /// Loyalty-point balance
    pub point_balance: Decimal,

    /// Lifetime credits applied to `total_balance`
    pub credited_amount: Decimal,

    /// Lifetime debits applied to `total_balance`
    pub debited_amount: Decimal,

    /// Funds held for in-flight withdrawals
    pub locked_balance: Decimal,

    /// Lifetime point credits
    pub credited_point_amount: Decimal,

    /// Lifetime point debits
    pub debited_point_amount: Decimal,

    /// Cash value of the point balance
    pub cash_point_balance: Decimal,

    /// Cash conversion rate per point
    pub cash_per_point: Decimal,

    /// Optional external account reference
    pub wallet_account: Option<String>,

    /// Wallet currency (ISO 4217 or token symbol)
    pub currency: String,

    /// Lifecycle state
    pub state: RecordState,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Create a fresh wallet with zeroed balances
    pub fn new(uuid: Uuid, user_id: u64, currency: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            uuid,
            seq: 0,
            user_id,
            total_balance: Decimal::ZERO,
            point_balance: Decimal::ZERO,
            credited_amount: Decimal::ZERO,
            debited_amount: Decimal::ZERO,
            locked_balance: Decimal::ZERO,
            credited_point_amount: Decimal::ZERO,
            debited_point_amount: Decimal::ZERO,
            cash_point_balance: Decimal::ZERO,
            cash_per_point: Decimal::ZERO,
            wallet_account: None,
            currency: currency.into(),
            state: RecordState::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Balance field targeted by entries of `kind`
    pub fn balance_for(&self, kind: EntryKind) -> Decimal {
        match kind {
            EntryKind::Point => self.point_balance,
            _ => self.total_balance,
        }
    }

    /// Apply a signed delta as a pure computation, returning the new
    /// wallet snapshot. Performs no I/O.
    ///
    /// `allow_negative` bypasses the non-negative floor on the targeted
    /// balance (forced debits such as refund reversals, and history
    /// replay). It does not touch `locked_balance`; hold tracking is
    /// the mutator's job.
    pub fn apply_delta(
        &self,
        kind: EntryKind,
        dr_or_cr: DrOrCr,
        amount: Decimal,
        allow_negative: bool,
    ) -> crate::Result<Wallet> {
        if amount <= Decimal::ZERO {
            return Err(crate::Error::InvalidEntry(
                "Amount must be positive".to_string(),
            ));
        }
        if self.state == RecordState::Archived {
            return Err(crate::Error::WalletArchived(self.uuid.to_string()));
        }
        if let Some(fixed) = kind.fixed_direction() {
            if fixed != dr_or_cr {
                return Err(crate::Error::InvalidEntry(format!(
                    "{} entries must be {}",
                    kind, fixed
                )));
            }
        }

        let mut next = self.clone();
        match kind {
            EntryKind::Point => match dr_or_cr {
                DrOrCr::Credit => {
                    next.point_balance += amount;
                    next.credited_point_amount += amount;
                }
                DrOrCr::Debit => {
                    if !allow_negative && self.point_balance < amount {
                        return Err(crate::Error::InsufficientFunds {
                            wallet: self.uuid.to_string(),
                            requested: amount,
                            available: self.point_balance,
                        });
                    }
                    next.point_balance -= amount;
                    next.debited_point_amount += amount;
                }
            },
            EntryKind::Transaction | EntryKind::Onramp | EntryKind::Offramp => match dr_or_cr {
                DrOrCr::Credit => {
                    next.credited_amount += amount;
                    next.total_balance += amount;
                }
                DrOrCr::Debit => {
                    if !allow_negative && self.total_balance < amount {
                        return Err(crate::Error::InsufficientFunds {
                            wallet: self.uuid.to_string(),
                            requested: amount,
                            available: self.total_balance,
                        });
                    }
                    next.debited_amount += amount;
                    next.total_balance -= amount;
                }
            },
        }

        next.updated_at = Utc::now();
        Ok(next)
    }

    /// Verify the cash-balance conservation invariant
    pub fn invariant_holds(&self) -> bool {
        self.total_balance == self.credited_amount - self.debited_amount
            && self.point_balance == self.credited_point_amount - self.debited_point_amount
    }
}

/// Counter-party KYC identity attached to settlement entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counterparty {
    /// Full name (retail)
    pub name: Option<String>,
    /// ISO 3166 country code
    pub country: Option<String>,
    /// E.164 phone number
    pub phone: Option<String>,
    /// Street address
    pub address: Option<String>,
    /// Date of birth (mm/dd/yyyy)
    pub dob: Option<String>,
    /// Email address
    pub email: Option<String>,
    /// National ID number
    pub id_number: Option<String>,
    /// National ID type
    pub id_type: Option<String>,
    /// Business ID (institution)
    pub business_id: Option<String>,
    /// Business name (institution)
    pub business_name: Option<String>,
    /// Additional ID type (Nigeria retail)
    pub additional_id_type: Option<String>,
    /// Additional ID number (Nigeria retail)
    pub additional_id_number: Option<String>,
}

/// Gateway-side settlement data attached to on/off-ramp entries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementDetails {
    /// Gateway sequence ID
    pub payment_reference: String,

    /// Gateway payment channel
    pub payment_channel: String,

    /// Settlement state-machine position
    pub settlement_status: SettlementStatus,

    /// Counter-party KYC identity (sender for offramp, recipient for onramp)
    pub counterparty: Option<Counterparty>,
}

/// Immutable record of one balance-affecting event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Idempotency key. Caller-issued for local entries, provider-issued
    /// for settlement entries (gateway retries collapse on it).
    pub uuid: Uuid,

    /// Surrogate store sequence (monotonic, assigned on insert)
    pub seq: u64,

    /// Owning wallet
    pub wallet_id: Uuid,

    /// Owning user
    pub user_id: u64,

    /// Entry kind
    pub kind: EntryKind,

    /// Direction
    pub dr_or_cr: DrOrCr,

    /// Positive amount (exact decimal)
    pub amount: Decimal,

    /// True when this debit is tracked as an in-flight withdrawal hold
    /// in the wallet's `locked_balance`. Released when the attached
    /// settlement reaches a terminal state.
    #[serde(default)]
    pub hold: bool,

    /// Wallet balance immediately after this entry was applied.
    /// Write-once audit value, never recomputed.
    pub balance_after: Decimal,

    /// Processing status
    pub status: EntryStatus,

    /// Lifecycle state
    pub state: RecordState,

    /// Free-form reference
    pub reference: Option<String>,

    /// Charge identifier
    pub charge_id: Option<String>,

    /// Chargeable resource type
    pub chargeable_type: Option<String>,

    /// Human-readable description
    pub description: Option<String>,

    /// Entry currency
    pub currency: String,

    /// Originating gateway label
    pub gateway: String,

    /// Opaque payload
    #[serde(default)]
    pub extra_data: HashMap<String, String>,

    /// External settlement data (on/off-ramp entries only)
    pub settlement: Option<SettlementDetails>,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Check whether this entry is tied to an external settlement
    pub fn is_settlement(&self) -> bool {
        self.settlement.is_some()
    }
}

/// Draft of a ledger entry, input to the Balance Mutator
#[derive(Debug, Clone)]
pub struct EntryDraft {
    /// Idempotency key
    pub uuid: Uuid,
    /// Entry kind
    pub kind: EntryKind,
    /// Direction
    pub dr_or_cr: DrOrCr,
    /// Positive amount
    pub amount: Decimal,
    /// Currency (defaults to the wallet currency when empty)
    pub currency: Option<String>,
    /// Free-form reference
    pub reference: Option<String>,
    /// Charge identifier
    pub charge_id: Option<String>,
    /// Chargeable resource type
    pub chargeable_type: Option<String>,
    /// Description
    pub description: Option<String>,
    /// Originating gateway label
    pub gateway: Option<String>,
    /// Initial processing status
    pub status: EntryStatus,
    /// Opaque payload
    pub extra_data: HashMap<String, String>,
    /// External settlement data
    pub settlement: Option<SettlementDetails>,
    /// Permit the targeted balance to go negative (forced debit)
    pub allow_negative: bool,
    /// Track this debit as an in-flight withdrawal hold
    pub hold: bool,
}

impl EntryDraft {
    /// Minimal draft with the required fields; everything else defaulted
    pub fn new(uuid: Uuid, kind: EntryKind, dr_or_cr: DrOrCr, amount: Decimal) -> Self {
        Self {
            uuid,
            kind,
            dr_or_cr,
            amount,
            currency: None,
            reference: None,
            charge_id: None,
            chargeable_type: None,
            description: None,
            gateway: None,
            status: EntryStatus::Default,
            extra_data: HashMap::new(),
            settlement: None,
            allow_negative: false,
            hold: false,
        }
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach settlement details (marks the entry Pending)
    pub fn with_settlement(mut self, settlement: SettlementDetails) -> Self {
        self.settlement = Some(settlement);
        self.status = EntryStatus::Pending;
        self
    }

    /// Track this debit as an in-flight withdrawal hold
    pub fn with_hold(mut self) -> Self {
        self.hold = true;
        self
    }
}
