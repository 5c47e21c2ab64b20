//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! mp-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `MINHPHAT_DATABASE_URL` - SQLite connection string (falls back to `DATABASE_URL`)
//!
//! Migrations live in `crates/server/migrations/` and are embedded in the
//! binary, so this works without the source tree.

use minh_phat_server::config::ServerConfig;
use minh_phat_server::db::{create_pool, sqlite::MIGRATOR};

/// Apply every pending migration.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the database cannot be
/// opened or a migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;

    tracing::info!("Connecting to SQLite database...");
    let pool = create_pool(&config.database_url).await?;

    tracing::info!("Running migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!(migrations = MIGRATOR.iter().count(), "Migrations complete!");
    Ok(())
}
