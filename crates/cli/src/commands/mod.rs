//! CLI command implementations.

pub mod admin;
pub mod migrate;
pub mod seed;
pub mod session;

use minh_phat_server::config::ServerConfig;
use minh_phat_server::db::SqliteStore;

/// Open the configured SQLite store, applying migrations on the way.
async fn open_store(config: &ServerConfig) -> Result<SqliteStore, Box<dyn std::error::Error>> {
    tracing::info!("Connecting to SQLite store...");
    Ok(SqliteStore::connect(&config.database_url).await?)
}
