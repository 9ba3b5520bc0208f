//! Settlement reconciler
//!
//! Bridges the payment gateway and the wallet ledger. The ordering rule
//! throughout is gateway-first: the provider call happens before any
//! ledger write, and the provider-issued transaction ID becomes the
//! entry's idempotency key, so provider retries and webhook replays
//! collapse onto one committed entry.

use crate::{
    config::Config,
    gateway::GatewayClient,
    kyc::validate_party,
    types::{
        settlement_status_from_provider, CryptoSettlementForm, Direction, ExchangeRate,
        PaymentChannel, PaymentCollectionForm, PaymentNetwork, PaymentRequestForm,
        PaymentResponse, ResolvedBankAccount, SettlementInfo, SupportedCountry, WebhookEvent,
        WebhookForm, WebhookInfo, WebhookUpdateForm,
    },
    Error, Result,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;
use wallet_core::{
    DrOrCr, EntryDraft, EntryKind, Ledger, LedgerEntry, RecordOutcome, SettlementDetails,
    SettlementStatus,
};

/// Outcome of submitting an on/off-ramp to the gateway
#[derive(Debug)]
pub struct SubmitOutcome {
    /// Provider response as received
    pub response: PaymentResponse,
    /// Ledger entry recorded against the wallet
    pub outcome: RecordOutcome,
}

/// Reconciles gateway-side payment state with the wallet ledger
pub struct Reconciler {
    ledger: Arc<Ledger>,
    gateway: Arc<dyn GatewayClient>,
    config: Config,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Create a reconciler over a ledger and a gateway client
    pub fn new(ledger: Arc<Ledger>, gateway: Arc<dyn GatewayClient>, config: Config) -> Self {
        Self {
            ledger,
            gateway,
            config,
        }
    }

    /// Submit a withdrawal: KYC check, gateway payment request, then a
    /// pending offramp debit keyed by the provider transaction ID.
    pub async fn submit_offramp(
        &self,
        wallet_id: Uuid,
        form: PaymentRequestForm,
    ) -> Result<SubmitOutcome> {
        validate_party(form.customer_type, &form.sender)?;

        let response = self.gateway.submit_payment_request(&form).await?;
        tracing::info!(
            provider_id = %response.id,
            sequence_id = %response.sequence_id,
            amount = %form.amount,
            "Payment request submitted"
        );

        let draft = self
            .settlement_draft(&response, EntryKind::Offramp, DrOrCr::Debit, form.amount)
            .with_description(format!(
                "{} {}",
                self.config.withdrawal_description, response.channel_id
            ))
            .with_settlement(SettlementDetails {
                payment_reference: response.sequence_id.clone(),
                payment_channel: response.channel_id.clone(),
                settlement_status: settlement_status_from_provider(&response.status)
                    .unwrap_or(SettlementStatus::Submitted),
                counterparty: Some(form.sender.clone()),
            });

        let outcome = self.ledger.record_entry(wallet_id, draft).await?;
        Ok(SubmitOutcome { response, outcome })
    }

    /// Submit a deposit: KYC check, gateway payment collection, then a
    /// pending onramp credit keyed by the provider transaction ID.
    pub async fn submit_onramp(
        &self,
        wallet_id: Uuid,
        form: PaymentCollectionForm,
    ) -> Result<SubmitOutcome> {
        validate_party(form.customer_type, &form.recipient)?;

        let response = self.gateway.submit_payment_collection(&form).await?;
        tracing::info!(
            provider_id = %response.id,
            sequence_id = %response.sequence_id,
            amount = %form.amount,
            "Payment collection submitted"
        );

        let draft = self
            .settlement_draft(&response, EntryKind::Onramp, DrOrCr::Credit, form.amount)
            .with_description(format!(
                "{} {}",
                self.config.deposit_description, response.channel_id
            ))
            .with_settlement(SettlementDetails {
                payment_reference: response.sequence_id.clone(),
                payment_channel: response.channel_id.clone(),
                settlement_status: settlement_status_from_provider(&response.status)
                    .unwrap_or(SettlementStatus::Submitted),
                counterparty: Some(form.recipient.clone()),
            });

        let outcome = self.ledger.record_entry(wallet_id, draft).await?;
        Ok(SubmitOutcome { response, outcome })
    }

    fn settlement_draft(
        &self,
        response: &PaymentResponse,
        kind: EntryKind,
        dr_or_cr: DrOrCr,
        amount: Decimal,
    ) -> EntryDraft {
        let mut draft = EntryDraft::new(response.id, kind, dr_or_cr, amount);
        draft.reference = Some(response.sequence_id.clone());
        draft
            .extra_data
            .insert("provider_status".to_string(), response.status.clone());
        draft
            .extra_data
            .insert("settlement_currency".to_string(), response.currency.clone());
        if let Some(converted) = response.converted_amount {
            draft
                .extra_data
                .insert("converted_amount".to_string(), converted.to_string());
        }
        if let Some(rate) = response.rate {
            draft.extra_data.insert("rate".to_string(), rate.to_string());
        }
        draft
    }

    /// Accept a submitted on/off-ramp with the gateway, then mirror the
    /// transition locally. Repeating the call is a no-op.
    pub async fn accept(&self, entry_id: Uuid) -> Result<LedgerEntry> {
        let entry = self.settlement_entry(entry_id)?;
        if self.already_at(&entry, SettlementStatus::Accepted) {
            return Ok(entry);
        }
        self.ensure_transition(&entry, SettlementStatus::Accepted)?;

        match entry.kind {
            EntryKind::Offramp => {
                self.gateway.accept_payment_request(entry_id).await?;
            }
            EntryKind::Onramp => {
                self.gateway.accept_collection(entry_id).await?;
            }
            other => {
                return Err(Error::Validation(format!(
                    "{} entries have no gateway-side settlement",
                    other
                )))
            }
        }

        Ok(self
            .ledger
            .update_settlement_status(entry_id, SettlementStatus::Accepted)
            .await?)
    }

    /// Deny a submitted on/off-ramp with the gateway, then mirror the
    /// transition locally.
    pub async fn deny(&self, entry_id: Uuid) -> Result<LedgerEntry> {
        let entry = self.settlement_entry(entry_id)?;
        if self.already_at(&entry, SettlementStatus::Denied) {
            return Ok(entry);
        }
        self.ensure_transition(&entry, SettlementStatus::Denied)?;

        match entry.kind {
            EntryKind::Offramp => {
                self.gateway.deny_payment_request(entry_id).await?;
            }
            EntryKind::Onramp => {
                self.gateway.deny_collection(entry_id).await?;
            }
            other => {
                return Err(Error::Validation(format!(
                    "{} entries have no gateway-side settlement",
                    other
                )))
            }
        }

        Ok(self
            .ledger
            .update_settlement_status(entry_id, SettlementStatus::Denied)
            .await?)
    }

    /// Cancel an accepted deposit collection.
    pub async fn cancel(&self, entry_id: Uuid) -> Result<LedgerEntry> {
        let entry = self.settlement_entry(entry_id)?;
        if entry.kind != EntryKind::Onramp {
            return Err(Error::Validation(
                "Only deposit collections can be cancelled".to_string(),
            ));
        }
        if self.already_at(&entry, SettlementStatus::Cancelled) {
            return Ok(entry);
        }
        self.ensure_transition(&entry, SettlementStatus::Cancelled)?;

        self.gateway.cancel_collection(entry_id).await?;
        Ok(self
            .ledger
            .update_settlement_status(entry_id, SettlementStatus::Cancelled)
            .await?)
    }

    /// Refund an accepted deposit collection and record the compensating
    /// debit. The compensating entry carries a uuid derived from the
    /// original, so refund replays collapse onto one debit.
    pub async fn refund(&self, entry_id: Uuid) -> Result<LedgerEntry> {
        let entry = self.settlement_entry(entry_id)?;
        if entry.kind != EntryKind::Onramp {
            return Err(Error::Validation(
                "Only deposit collections can be refunded".to_string(),
            ));
        }

        let entry = if self.already_at(&entry, SettlementStatus::Refunded) {
            entry
        } else {
            self.ensure_transition(&entry, SettlementStatus::Refunded)?;
            self.gateway.refund_collection(entry_id).await?;
            self.ledger
                .update_settlement_status(entry_id, SettlementStatus::Refunded)
                .await?
        };

        self.compensate_refund(&entry).await?;
        Ok(entry)
    }

    /// Mark an accepted on/off-ramp as settled (funds confirmed).
    pub async fn settle(&self, entry_id: Uuid) -> Result<LedgerEntry> {
        let entry = self.settlement_entry(entry_id)?;
        if self.already_at(&entry, SettlementStatus::Settled) {
            return Ok(entry);
        }
        Ok(self
            .ledger
            .update_settlement_status(entry_id, SettlementStatus::Settled)
            .await?)
    }

    /// Ingest a gateway webhook event. Replays and already-applied
    /// transitions are no-ops; unknown provider statuses are ignored
    /// with a warning.
    pub async fn apply_webhook(&self, event: &WebhookEvent) -> Result<LedgerEntry> {
        let entry = self.settlement_entry(event.id)?;

        let Some(target) = settlement_status_from_provider(&event.status) else {
            tracing::warn!(
                provider_id = %event.id,
                status = %event.status,
                "Ignoring webhook with unknown provider status"
            );
            return Ok(entry);
        };

        if self.already_at(&entry, target) || target == SettlementStatus::Submitted {
            return Ok(entry);
        }

        let updated = self
            .ledger
            .update_settlement_status(event.id, target)
            .await?;

        if target == SettlementStatus::Refunded && updated.kind == EntryKind::Onramp {
            self.compensate_refund(&updated).await?;
        }

        Ok(updated)
    }

    /// Record the debit that reverses a refunded deposit credit.
    async fn compensate_refund(&self, original: &LedgerEntry) -> Result<RecordOutcome> {
        let refund_uuid = Uuid::new_v5(
            &Uuid::NAMESPACE_OID,
            format!("refund:{}", original.uuid).as_bytes(),
        );

        let mut draft = EntryDraft::new(
            refund_uuid,
            EntryKind::Transaction,
            DrOrCr::Debit,
            original.amount,
        )
        .with_description(format!(
            "Refund of deposit {}",
            original
                .settlement
                .as_ref()
                .map(|s| s.payment_reference.as_str())
                .unwrap_or("unknown")
        ));
        draft.reference = Some(original.uuid.to_string());
        // The deposit may already be partially spent
        draft.allow_negative = true;

        let outcome = self.ledger.record_entry(original.wallet_id, draft).await?;
        if !outcome.replayed {
            tracing::info!(
                original = %original.uuid,
                refund = %refund_uuid,
                amount = %original.amount,
                "Recorded compensating refund debit"
            );
        }
        Ok(outcome)
    }

    /// Reject an illegal transition before any gateway call is made
    fn ensure_transition(&self, entry: &LedgerEntry, target: SettlementStatus) -> Result<()> {
        let current = entry
            .settlement
            .as_ref()
            .map(|s| s.settlement_status)
            .unwrap_or(SettlementStatus::Submitted);
        if !current.can_transition_to(target) {
            return Err(Error::Ledger(wallet_core::Error::InvalidStateTransition {
                from: current.to_string(),
                to: target.to_string(),
            }));
        }
        Ok(())
    }

    fn settlement_entry(&self, entry_id: Uuid) -> Result<LedgerEntry> {
        let entry = self.ledger.entry(entry_id)?;
        if !entry.is_settlement() {
            return Err(Error::Validation(format!(
                "Entry {} is not tied to an external settlement",
                entry_id
            )));
        }
        Ok(entry)
    }

    fn already_at(&self, entry: &LedgerEntry, target: SettlementStatus) -> bool {
        entry
            .settlement
            .as_ref()
            .map(|s| s.settlement_status == target)
            .unwrap_or(false)
    }

    /// Countries the gateway supports for a direction
    pub async fn supported_countries(&self, direction: Direction) -> Result<Vec<SupportedCountry>> {
        self.gateway.supported_countries(direction).await
    }

    /// Payment channels available in a country
    pub async fn channels(&self, country_code: &str) -> Result<Vec<PaymentChannel>> {
        self.gateway.channels(country_code).await
    }

    /// Payment networks available in a country
    pub async fn networks(&self, country_code: &str) -> Result<Vec<PaymentNetwork>> {
        self.gateway.networks(country_code).await
    }

    /// Base exchange rate for a fiat currency
    pub async fn exchange_rate(&self, currency: &str) -> Result<ExchangeRate> {
        self.gateway.exchange_rate(currency).await
    }

    /// Resolve a bank account before payout
    pub async fn resolve_bank_account(
        &self,
        account_number: &str,
        network_id: &str,
    ) -> Result<ResolvedBankAccount> {
        self.gateway
            .resolve_bank_account(account_number, network_id)
            .await
    }

    /// Create a crypto settlement against the gateway float
    pub async fn create_settlement(&self, form: &CryptoSettlementForm) -> Result<SettlementInfo> {
        self.gateway.create_settlement(form).await
    }

    /// Fetch a settlement by its sequence ID
    pub async fn settlement_by_sequence(&self, sequence_id: &str) -> Result<SettlementInfo> {
        self.gateway.settlement_by_sequence(sequence_id).await
    }

    /// Register a webhook with the gateway
    pub async fn create_webhook(&self, form: &WebhookForm) -> Result<WebhookInfo> {
        self.gateway.create_webhook(form).await
    }

    /// Update a gateway webhook
    pub async fn update_webhook(&self, form: &WebhookUpdateForm) -> Result<WebhookInfo> {
        self.gateway.update_webhook(form).await
    }

    /// Delete a gateway webhook
    pub async fn delete_webhook(&self, id: &str) -> Result<WebhookInfo> {
        self.gateway.delete_webhook(id).await
    }
}
