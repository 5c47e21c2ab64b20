//! Seed command.
//!
//! ```bash
//! MINHPHAT_ADMIN_PASSWORD=change-me mp-cli seed
//! ```
//!
//! Writes the default admin and the starter catalog into an empty SQLite
//! store. Running it again changes nothing.

use minh_phat_server::config::ServerConfig;
use minh_phat_server::db::seed::seed;

/// Seed the configured SQLite store.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or a write fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;
    let store = super::open_store(&config).await?;

    let outcome = seed(&store, &config.admin_password).await?;
    if !outcome.admin_created && !outcome.catalog_seeded {
        tracing::info!("Store already seeded, nothing to do");
    }
    Ok(())
}
