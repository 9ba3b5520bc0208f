//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `wallet_entries_total` - Total ledger entries committed, by kind
//! - `wallet_entry_replays_total` - Idempotent replays collapsed
//! - `wallet_insufficient_funds_total` - Debits rejected for funds
//! - `wallet_record_duration_seconds` - Histogram of record latencies
//! - `wallet_wallets_total` - Wallets provisioned

use crate::types::EntryKind;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Total entries committed, labeled by kind
    pub entries_total: IntCounterVec,

    /// Idempotent replays collapsed
    pub replays_total: IntCounter,

    /// Debits rejected for insufficient funds
    pub insufficient_funds_total: IntCounter,

    /// Record latency histogram
    pub record_duration: Histogram,

    /// Wallets provisioned
    pub wallets_total: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create new metrics collector
    ///
    /// Registers against an owned registry, not the process-global one,
    /// so multiple ledgers can coexist in one process.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let entries_total = IntCounterVec::new(
            Opts::new("wallet_entries_total", "Total ledger entries committed"),
            &["kind"],
        )?;
        registry.register(Box::new(entries_total.clone()))?;

        let replays_total = IntCounter::with_opts(Opts::new(
            "wallet_entry_replays_total",
            "Idempotent replays collapsed onto committed entries",
        ))?;
        registry.register(Box::new(replays_total.clone()))?;

        let insufficient_funds_total = IntCounter::with_opts(Opts::new(
            "wallet_insufficient_funds_total",
            "Debits rejected for insufficient funds",
        ))?;
        registry.register(Box::new(insufficient_funds_total.clone()))?;

        let record_duration = Histogram::with_opts(
            HistogramOpts::new(
                "wallet_record_duration_seconds",
                "Histogram of record_entry latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]),
        )?;
        registry.register(Box::new(record_duration.clone()))?;

        let wallets_total = IntCounter::with_opts(Opts::new(
            "wallet_wallets_total",
            "Wallets provisioned",
        ))?;
        registry.register(Box::new(wallets_total.clone()))?;

        Ok(Self {
            entries_total,
            replays_total,
            insufficient_funds_total,
            record_duration,
            wallets_total,
            registry,
        })
    }

    /// Record a committed entry
    pub fn record_entry(&self, kind: EntryKind) {
        self.entries_total
            .with_label_values(&[&kind.to_string()])
            .inc();
    }

    /// Record a collapsed replay
    pub fn record_replay(&self) {
        self.replays_total.inc();
    }

    /// Record a rejected debit
    pub fn record_insufficient_funds(&self) {
        self.insufficient_funds_total.inc();
    }

    /// Record a record_entry latency
    pub fn record_duration(&self, duration_seconds: f64) {
        self.record_duration.observe(duration_seconds);
    }

    /// Record a provisioned wallet
    pub fn record_wallet_created(&self) {
        self.wallets_total.inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
