//! Wire types for the payment gateway
//!
//! These mirror the gateway's JSON contract, so the wire structs use
//! camelCase field names on the wire and snake_case in Rust.

use crate::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use wallet_core::{Counterparty, SettlementStatus};

/// Money-flow direction from the custodian's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Funds entering wallets (collections)
    Deposit,
    /// Funds leaving wallets (payments)
    Withdraw,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Deposit => write!(f, "deposit"),
            Direction::Withdraw => write!(f, "withdraw"),
        }
    }
}

/// Customer classification driving the KYC field requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerType {
    /// Individual customer
    Retail,
    /// Business customer
    Institution,
}

impl FromStr for CustomerType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "retail" => Ok(CustomerType::Retail),
            "institution" => Ok(CustomerType::Institution),
            other => Err(Error::Validation(format!(
                "Invalid customerType '{}'. Must be either 'retail' or 'institution'",
                other
            ))),
        }
    }
}

impl fmt::Display for CustomerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomerType::Retail => write!(f, "retail"),
            CustomerType::Institution => write!(f, "institution"),
        }
    }
}

/// Destination or source bank/mobile-money account
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRef {
    /// Account number
    pub account_number: String,
    /// Account type (bank, momo)
    pub account_type: String,
    /// Gateway network the account lives on
    pub network_id: String,
    /// Resolved account holder name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
}

/// Withdrawal (payment request) submission form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequestForm {
    /// Gateway channel to pay through
    pub channel_id: String,
    /// Amount in the wallet currency
    pub amount: Decimal,
    /// Amount in the local fiat currency, if quoting locally
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_amount: Option<Decimal>,
    /// Free-form reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Customer classification
    pub customer_type: CustomerType,
    /// KYC identity of the sending customer
    pub sender: Counterparty,
    /// Account the funds are paid out to
    pub destination: AccountRef,
    /// Skip the manual acceptance step on the gateway side
    #[serde(default)]
    pub force_accept: bool,
}

/// Deposit (payment collection) submission form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCollectionForm {
    /// Gateway channel to collect through
    pub channel_id: String,
    /// Amount in the wallet currency
    pub amount: Decimal,
    /// Amount in the local fiat currency, if quoting locally
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_amount: Option<Decimal>,
    /// Free-form reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Customer classification
    pub customer_type: CustomerType,
    /// KYC identity of the paying customer
    pub recipient: Counterparty,
    /// Account the funds are collected from
    pub source: AccountRef,
    /// Skip the manual acceptance step on the gateway side
    #[serde(default)]
    pub force_accept: bool,
}

/// Gateway response to a payment or collection submission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    /// Provider-issued transaction ID (our idempotency key)
    pub id: Uuid,
    /// Provider-issued sequence ID for later lookup
    pub sequence_id: String,
    /// Channel the payment runs through
    pub channel_id: String,
    /// Provider-side status string
    pub status: String,
    /// Wallet-currency amount
    pub amount: Decimal,
    /// Local-currency amount after conversion
    #[serde(default)]
    pub converted_amount: Option<Decimal>,
    /// Settlement currency
    pub currency: String,
    /// Conversion rate applied
    #[serde(default)]
    pub rate: Option<Decimal>,
}

/// Gateway response to an accept/deny/cancel/refund call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateResponse {
    /// Provider-issued transaction ID
    pub id: Uuid,
    /// Provider-side status string after the transition
    pub status: String,
}

/// Country the gateway supports for a given direction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedCountry {
    /// Country name
    pub country: String,
    /// ISO 3166 country code
    pub code: String,
    /// Local fiat currency
    pub currency: String,
    /// Supported payment methods
    #[serde(default)]
    pub supported_methods: Vec<String>,
}

/// Payment channel available in a country
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentChannel {
    /// Channel ID
    pub id: String,
    /// Channel type (bank, momo)
    pub channel_type: String,
    /// ISO 3166 country code
    pub country: String,
    /// Local fiat currency
    pub currency: String,
    /// Channel status (active, inactive)
    pub status: String,
}

/// Payment network available in a country
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentNetwork {
    /// Network ID
    pub id: String,
    /// Network code
    pub code: String,
    /// Network name
    pub name: String,
    /// ISO 3166 country code
    pub country: String,
    /// Network status (active, inactive)
    pub status: String,
}

/// Exchange rate quote for one fiat currency
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRate {
    /// Fiat currency code
    pub currency: String,
    /// Rate applied when buying the fiat currency
    pub buy: Decimal,
    /// Rate applied when selling the fiat currency
    pub sell: Decimal,
}

/// Result of resolving a bank account before payout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedBankAccount {
    /// Account number as resolved
    pub account_number: String,
    /// Verified account holder name
    pub account_name: String,
    /// Network the account lives on
    pub network_id: String,
}

/// Crypto settlement creation form (treasury top-up of the gateway float)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoSettlementForm {
    /// Amount to settle
    pub amount: Decimal,
    /// Crypto currency to settle in
    pub crypto_currency: String,
    /// Chain the payout runs on
    pub crypto_network: String,
    /// On-chain destination address
    pub address: String,
}

/// Gateway-side settlement record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementInfo {
    /// Provider-issued settlement ID
    pub id: Uuid,
    /// Provider-issued sequence ID
    pub sequence_id: String,
    /// Provider-side status string
    pub status: String,
    /// Settled amount
    pub amount: Decimal,
    /// Settlement currency
    pub currency: String,
}

/// Webhook registration form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookForm {
    /// Callback URL
    pub url: String,
    /// Event state the webhook subscribes to
    pub state: String,
    /// Whether the webhook is live
    pub active: bool,
}

/// Webhook update form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookUpdateForm {
    /// Webhook ID
    pub id: String,
    /// Callback URL
    pub url: String,
    /// Event state the webhook subscribes to
    pub state: String,
    /// Whether the webhook is live
    pub active: bool,
}

/// Gateway-side webhook record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookInfo {
    /// Webhook ID
    pub id: String,
    /// Callback URL
    pub url: String,
    /// Event state the webhook subscribes to
    pub state: String,
    /// Whether the webhook is live
    pub active: bool,
}

/// Inbound webhook event pushed by the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    /// Provider-issued transaction ID (matches the entry uuid)
    pub id: Uuid,
    /// Provider-issued sequence ID
    pub sequence_id: String,
    /// Provider-side status string
    pub status: String,
}

/// Map a provider status string onto the settlement state machine.
///
/// Unknown strings return `None`; the caller decides whether to ignore
/// or reject them.
pub fn settlement_status_from_provider(status: &str) -> Option<SettlementStatus> {
    match status.to_ascii_lowercase().as_str() {
        "created" | "pending" | "processing" | "submitted" => Some(SettlementStatus::Submitted),
        "accepted" => Some(SettlementStatus::Accepted),
        "complete" | "completed" | "settled" => Some(SettlementStatus::Settled),
        "denied" | "failed" => Some(SettlementStatus::Denied),
        "cancelled" | "canceled" => Some(SettlementStatus::Cancelled),
        "refunded" => Some(SettlementStatus::Refunded),
        _ => None,
    }
}
