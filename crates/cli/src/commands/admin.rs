//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create a new admin user
//! MINHPHAT_NEW_ADMIN_PASSWORD=s3cret mp-cli admin create -u lan -n "Nguyễn Lan" -e lan@minhphat.com
//!
//! # List admin users
//! mp-cli admin list
//! ```
//!
//! # Environment Variables
//!
//! - `MINHPHAT_DATABASE_URL` - SQLite connection string
//! - `MINHPHAT_NEW_ADMIN_PASSWORD` - Password for `admin create`

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use minh_phat_core::{AdminUser, Email, NewAdminUser};
use minh_phat_server::config::ServerConfig;
use minh_phat_server::db::Store;
use minh_phat_server::services::auth::hash_password;

const PASSWORD_VAR: &str = "MINHPHAT_NEW_ADMIN_PASSWORD";
const MIN_PASSWORD_LEN: usize = 8;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Password too short.
    #[error("Password must be at least {MIN_PASSWORD_LEN} characters")]
    WeakPassword,

    /// Username blank.
    #[error("Username is required")]
    MissingUsername,

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),
}

fn new_password() -> Result<SecretString, AdminError> {
    let password = std::env::var(PASSWORD_VAR)
        .ok()
        .filter(|p| !p.is_empty())
        .map(SecretString::from)
        .ok_or(AdminError::MissingEnvVar(PASSWORD_VAR))?;
    if password.expose_secret().chars().count() < MIN_PASSWORD_LEN {
        return Err(AdminError::WeakPassword);
    }
    Ok(password)
}

/// Create a new admin user.
///
/// # Errors
///
/// Returns an error for a missing or short password, a bad email, a taken
/// username or a store failure.
pub async fn create_user(
    username: &str,
    full_name: Option<String>,
    email: Option<&str>,
) -> Result<AdminUser, Box<dyn std::error::Error>> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AdminError::MissingUsername.into());
    }
    let email = email
        .map(|e| Email::parse(e).map_err(|err| AdminError::InvalidEmail(err.to_string())))
        .transpose()?;
    let password = new_password()?;

    let config = ServerConfig::from_env()?;
    let store = super::open_store(&config).await?;

    tracing::info!("Creating admin user: {}", username);
    let user = store
        .create_admin_user(NewAdminUser {
            username: username.to_string(),
            password_hash: hash_password(password.expose_secret())?,
            full_name: full_name.filter(|n| !n.trim().is_empty()),
            email,
            is_active: true,
        })
        .await?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Username: {}",
        user.id,
        user.username
    );
    Ok(user)
}

/// Print every admin user.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or read.
pub async fn list_users() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;
    let store = super::open_store(&config).await?;
    let users = store.list_admin_users().await?;

    #[allow(clippy::print_stdout)]
    {
        println!(
            "{:<20} {:<24} {:<28} {:<8} LAST LOGIN",
            "USERNAME", "NAME", "EMAIL", "ACTIVE"
        );
        for user in &users {
            println!("{}", format_row(user));
        }
    }
    tracing::info!(count = users.len(), "Listed admin users");
    Ok(())
}

fn format_row(user: &AdminUser) -> String {
    format!(
        "{:<20} {:<24} {:<28} {:<8} {}",
        user.username,
        user.full_name.as_deref().unwrap_or("-"),
        user.email.as_ref().map_or("-", Email::as_str),
        if user.is_active { "yes" } else { "no" },
        user.last_login
            .map_or_else(|| "never".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string()),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use minh_phat_core::AdminUserId;

    #[test]
    fn test_format_row_fills_blanks() {
        let now = Utc::now();
        let user = AdminUser::from_input(
            AdminUserId::new("u1"),
            NewAdminUser {
                username: "admin".to_string(),
                password_hash: "x".to_string(),
                full_name: None,
                email: None,
                is_active: false,
            },
            now,
        );
        let row = format_row(&user);
        assert!(row.starts_with("admin "));
        assert!(row.contains(" no "));
        assert!(row.ends_with("never"));
    }
}
