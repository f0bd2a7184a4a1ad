//! Price Snapshot Service
//!
//! One-shot market snapshot: aggregates quotes for the symbols given on the
//! command line (or the configured overview universe) and prints the
//! overview as JSON on stdout.
//!
//! Usage: `price_snapshot_rust [SYMBOL...]`

use anyhow::Result;
use cryptsist_core::{MarketDataConfig, MarketDataService};
use dotenv::dotenv;
use std::env;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting price snapshot...");

    let config = MarketDataConfig::from_env()?;
    let service = MarketDataService::from_config(&config)?;

    for availability in service.source_availability() {
        if availability.configured {
            info!("Source {} ready", availability.source.display_name());
        } else {
            warn!("Source {} has no credentials, it will be skipped", availability.source.display_name());
        }
    }

    let args: Vec<String> = env::args().skip(1).collect();
    let symbols: Vec<&str> = args.iter().map(String::as_str).collect();

    let overview = service.get_market_overview(&symbols).await;
    println!("{}", serde_json::to_string_pretty(&overview)?);

    Ok(())
}
