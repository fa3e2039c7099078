//! Runs pending SQLx migrations against the database.
//!
//! Migrations are embedded at compile time. Used as a deploy step before
//! starting the server.

use anyhow::Result;

use content_factory_common::AppConfig;
use content_factory_store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_lookup(|key| std::env::var(key).ok());

    println!("Running database migrations...");

    let store = PgStore::connect(config.require_database_url()?, 2).await?;
    store.migrate().await?;

    println!("Migrations completed successfully.");

    Ok(())
}
