//! Bounty Escrow Server
//!
//! Replays the event journal and serves the escrow over HTTP.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bounty_escrow::{BountyEscrow, Config, EventStore, SystemClock, VaultTransfer, WebhookNotifier};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Bounty Escrow Server");

    let config_path =
        std::env::var("ESCROW_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let config = Config::load_from(&config_path)?;
    let genesis = config.genesis()?;

    let store = Arc::new(
        EventStore::open(&config.database.path)
            .with_context(|| format!("Failed to open journal {}", config.database.path))?,
    );

    let mut escrow = BountyEscrow::open(store, genesis, Arc::new(SystemClock))
        .context("Failed to restore ledger from journal")?
        .with_transfer(Arc::new(VaultTransfer::new()));

    if let Some(url) = config.webhook_url() {
        info!("Bounty notifications enabled");
        escrow = escrow.with_notifier(Arc::new(WebhookNotifier::new(
            url,
            Duration::from_secs(config.notifier.timeout_secs),
        )));
    }

    let totals = escrow.totals();
    info!(
        "Ledger ready: {} bounties, pool balance {}",
        escrow.bounty_count(),
        totals.pool_balance()
    );

    bounty_escrow::server::run_server(&config.server.host, config.server.port, Arc::new(escrow))
        .await?;

    Ok(())
}
