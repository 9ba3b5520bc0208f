//! Wallet ledger server binary

use anyhow::Result;
use wallet_core::{Config, Ledger};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Unwind Wallet Server");

    // Load configuration
    let config = Config::from_env()?;

    // Open ledger
    let ledger = Ledger::open(config)?;
    let stats = ledger.stats()?;
    tracing::info!(
        wallets = stats.total_wallets,
        entries = stats.total_entries,
        "Ledger opened successfully"
    );

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down wallet server");
    Ok(())
}
