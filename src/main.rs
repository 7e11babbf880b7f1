//! Treasure Hunt Game Server
//!
//! Authoritative game server for the treasure hunt board game.
//! Configuration comes from `TREASURE_*` environment variables, log levels
//! from `RUST_LOG`.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use treasure_hunt::{GameServer, ServerConfig, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();

    info!("Treasure Hunt Server v{}", VERSION);
    info!(
        "Capacity: {} games, lifetime {} s, freshness window {} s",
        config.registry.capacity,
        config.registry.ttl.as_secs(),
        config.service.freshness_window.as_secs()
    );

    let server = GameServer::new(config);
    server.run().await.context("game server stopped")?;

    Ok(())
}
