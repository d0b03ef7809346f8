//! Database access for the storefront's `PostgreSQL`.
//!
//! # Database: `evmarket_storefront`
//!
//! The marketplace backend is the source of truth for products, auctions,
//! wallets and orders. Locally there is only the session store:
//!
//! - `tower_sessions.session` - session records (cart, checkout selection,
//!   voucher code, marketplace token)
//!
//! # Migrations
//!
//! The session schema is created by tower-sessions itself and run via:
//! ```bash
//! cargo run -p evmarket-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::middleware::session_store;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Create the session-store schema and table if they are missing.
///
/// # Errors
///
/// Returns `sqlx::Error` if the DDL fails.
pub async fn migrate_session_store(pool: &PgPool) -> Result<(), sqlx::Error> {
    session_store(pool).migrate().await
}
