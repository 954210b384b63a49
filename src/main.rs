mod bot;
mod cache;
mod commands;
mod config;
mod errors;
mod fetcher;
mod models;
mod presence;
mod username;

use crate::errors::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file (as early as possible)
    dotenv().ok(); // Non-fatal, env vars can be set externally
    info!("Attempted to load .env file.");

    // 3. Load configuration. A missing DISCORD_TOKEN fails here, before any
    // platform contact, and the process exits with status 1.
    let config = config::BotConfig::from_env()
        .inspect_err(|e| error!("Critical error loading configuration: {}", e))?;
    info!(
        "Configuration loaded: asset {}, presence every {:?}, username updates {}",
        config.asset_id,
        config.presence_interval,
        if config.update_username { "on" } else { "off" }
    );

    // 4. Run the bot (connects, reconciles commands, starts schedulers)
    bot::run_bot(Arc::new(config))
        .await
        .inspect_err(|e| error!("Bot terminated with error: {}", e))?;

    Ok(())
}
