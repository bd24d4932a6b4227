//! LedgerDesk main entry point

use anyhow::Context;
use clap::Parser;
use ledgerdesk_api::start_server;
use ledgerdesk_config::{Config, ConfigError};
use ledgerdesk_core::{LedgerStore, MemoryStore};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;

#[derive(Parser, Debug)]
#[command(name = "ledgerdesk")]
#[command(version = "0.1.0")]
#[command(about = "Bookkeeping and financial statement server", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Print the default configuration and exit
    #[arg(long)]
    print_default_config: bool,
}

fn load_config(path: &PathBuf) -> anyhow::Result<(Config, bool)> {
    match Config::load(path) {
        Ok(config) => Ok((config, true)),
        Err(ConfigError::FileNotFound { .. }) => Ok((Config::default(), false)),
        Err(e) => Err(anyhow::anyhow!(e.to_details().to_string()))
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", Config::generate_default());
        return Ok(());
    }

    let (config, found) = load_config(&args.config)?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.logging.level.as_str())).init();

    if found {
        log::info!("Config loaded from {}", args.config.display());
    } else {
        log::warn!("Config file {} not found, using defaults", args.config.display());
    }

    let rt = Runtime::new()?;
    rt.block_on(async {
        let store = MemoryStore::from_config(&config);
        let snapshot = config.snapshot_path();
        log::info!("Looking for ledger snapshot: {}", snapshot.display());
        store
            .load_snapshot(&snapshot)
            .await
            .with_context(|| format!("Failed to load ledger snapshot {}", snapshot.display()))?;

        let store = Arc::new(store);
        let shared: Arc<dyn LedgerStore> = store.clone();
        start_server(config, shared).await.context("Server error")?;

        // Keep whatever was entered while running
        store
            .save_snapshot(&snapshot)
            .await
            .with_context(|| format!("Failed to save ledger snapshot {}", snapshot.display()))?;
        log::info!("Ledger snapshot saved to {}", snapshot.display());
        Ok::<(), anyhow::Error>(())
    })
}
