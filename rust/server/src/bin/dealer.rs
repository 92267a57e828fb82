//! Dealer service binary
//!
//! Usage: cargo run -p dealer-server --bin dealer -- --port 8080

use clap::Parser;
use dealer_server::config::{self, CliArgs};
use dealer_server::DealerServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    dealer_server::init_logging(args.log_json || dealer_server::logging::json_from_env());

    let resolved = config::load_with_sources(&args)?;
    tracing::info!(config = ?resolved.config, sources = ?resolved.sources, "configuration loaded");

    let handle = DealerServer::new(resolved.config)?.start().await?;
    tracing::info!("dealer running at http://{}", handle.address());

    tokio::signal::ctrl_c().await?;

    tracing::info!("shutting down");
    handle.shutdown().await?;
    tracing::info!("dealer stopped cleanly");

    Ok(())
}
