use std::time::Duration;

use clap::Parser;
use tokio::time;
use tracing_subscriber::EnvFilter;

use arb_keeper::{Keeper, KeeperConfig, KeeperError};

#[derive(Parser, Debug)]
#[command(name = "arb-keeper")]
#[command(about = "Development-mode harness for the arbitrage core")]
struct Args {
    /// Path to harness configuration file
    #[arg(short, long, default_value = "keeper.toml")]
    config: String,

    /// Write a ready-to-edit example configuration to --config and exit
    #[arg(long)]
    init: bool,

    /// Dry run mode: find opportunities but never pretend to submit them
    #[arg(long)]
    dry_run: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), KeeperError> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    if args.init {
        arb_keeper::config::create_example_config(&args.config)?;
        tracing::info!(path = %args.config, "wrote example configuration");
        return Ok(());
    }

    tracing::info!("starting arb-keeper harness");
    if args.dry_run {
        tracing::warn!("running in DRY RUN mode - opportunities are logged, never submitted");
    }

    let config = KeeperConfig::load(&args.config)?;
    tracing::info!(pools = config.pools.len(), "loaded configuration");

    let mut keeper = Keeper::new(config.clone(), args.dry_run)?;
    tracing::info!("harness initialized, pools seeded and activated where possible");

    let mut interval_timer = time::interval(Duration::from_millis(config.tick_interval_ms));
    let mut iteration = 0u64;

    loop {
        interval_timer.tick().await;
        iteration += 1;

        tracing::debug!(iteration, "harness tick");
        let opportunities = keeper.run_once();
        if !opportunities.is_empty() {
            tracing::info!(iteration, count = opportunities.len(), "found arbitrage opportunities this tick");
        }

        if iteration % 100 == 0 {
            keeper.health_check();
        }
    }
}
