#![allow(clippy::result_large_err)]

use dotenvy::dotenv;
use ecobot::{
    bot,
    config::{self, Settings},
    core::{Economy, loan, pet},
    errors::Result,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also come from the environment
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Settings and economy tuning
    let settings = Settings::from_env()
        .inspect_err(|e| error!("DISCORD_TOKEN missing or settings invalid: {}", e))?;
    let economy_config = config::economy::load_config(&settings.config_path)
        .inspect(|_| info!("Loaded economy settings from {}", settings.config_path))
        .inspect_err(|e| error!("Critical error loading economy configuration: {}", e))?;

    // 4. Database
    let db = config::database::create_connection(&settings.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    config::database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    let economy = Arc::new(Economy::new(db, economy_config));

    // 5. Pet catalog
    pet::sync_catalog(&economy.db, &economy.config.pets)
        .await
        .inspect(|count| info!("Synced {} pet definitions.", count))
        .inspect_err(|e| error!("Failed to sync pet catalog: {}", e))?;

    // 6. Background interest
    let _interest_job = loan::spawn_interest_job(Arc::clone(&economy));

    // 7. Run the bot
    bot::run_bot(settings, economy).await?;

    Ok(())
}
