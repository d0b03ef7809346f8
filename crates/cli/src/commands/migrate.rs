//! Session store migration.
//!
//! The storefront keeps no business data of its own; the only table it owns
//! is the `tower-sessions` store. Run this once per database before starting
//! the server.
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

use evmarket_storefront::config::{ConfigError, StorefrontConfig};
use evmarket_storefront::db;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Create or update the session store schema.
///
/// # Errors
///
/// Returns `MigrationError` if the URL is missing or the DDL fails.
pub async fn sessions() -> Result<(), MigrationError> {
    let database_url = StorefrontConfig::database_url_from_env()?;

    tracing::info!("Connecting to storefront database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Running session store migration...");
    db::migrate_session_store(&pool).await?;

    tracing::info!("Session store migration complete!");
    Ok(())
}
