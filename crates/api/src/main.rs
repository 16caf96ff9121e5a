//! Stereo Camera Node - Main Entry Point

use api::{init_logging, run_server, StereoNodeConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cfg = StereoNodeConfig::load()?;
    info!("=== Stereo Camera Node v{} ===", env!("CARGO_PKG_VERSION"));
    info!(role = ?cfg.role, "Starting capture node...");

    run_server(cfg).await
}
