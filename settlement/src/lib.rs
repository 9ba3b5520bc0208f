//! Settlement layer for the wallet ledger
//!
//! Connects wallets to an external payment gateway for fiat on/off-ramps:
//!
//! 1. **Validation**: KYC preconditions on the counter-party, checked
//!    before any network call
//! 2. **Submission**: the gateway call runs first, and the
//!    provider-issued transaction ID keys the ledger entry
//! 3. **Reconciliation**: accept/deny/cancel/refund calls and webhook
//!    events drive the settlement state machine, with refunds
//!    compensated by deterministic ledger entries
//!
//! The gateway itself sits behind the [`gateway::GatewayClient`] trait;
//! production uses [`gateway::HttpGatewayClient`] with `YcHmacV1`
//! request signing.
//!
//! # Example
//!
//! ```no_run
//! use settlement::{Config, Reconciler};
//! use settlement::gateway::HttpGatewayClient;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> settlement::Result<()> {
//!     let config = Config::from_env()?;
//!     let gateway = Arc::new(HttpGatewayClient::new(&config.gateway)?);
//!
//!     let ledger = Arc::new(wallet_core::Ledger::open(wallet_core::Config::default())?);
//!     let reconciler = Reconciler::new(ledger, gateway, config);
//!
//!     // let outcome = reconciler.submit_offramp(wallet_id, form).await?;
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod error;
pub mod gateway;
pub mod kyc;
pub mod reconciler;
pub mod types;

// Re-exports
pub use config::{Config, GatewayConfig};
pub use error::{Error, Result};
pub use gateway::{GatewayClient, HttpGatewayClient, RequestSigner};
pub use reconciler::{Reconciler, SubmitOutcome};
pub use types::{
    CustomerType, Direction, PaymentCollectionForm, PaymentRequestForm, PaymentResponse,
    WebhookEvent,
};
