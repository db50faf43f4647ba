//! Connection pool construction.
//!
//! The driver is chosen at runtime from the URL scheme, so one binary can talk
//! to Postgres, MySQL or SQLite.

use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::AnyPool;
use tracing::info;

use crate::DatabaseConfig;

/// Create a connection pool and verify that one connection can be opened.
///
/// # Errors
///
/// Returns an error if the database cannot be reached with the configured URL.
pub async fn connect(config: &DatabaseConfig) -> Result<AnyPool, sqlx::Error> {
    install_default_drivers();

    let pool = AnyPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .max_lifetime(config.max_lifetime)
        .connect(&config.url)
        .await?;

    info!(
        backend = ?config.backend,
        max_connections = config.max_connections,
        "database pool ready"
    );
    Ok(pool)
}
