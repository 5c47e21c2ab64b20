//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Username or password missing from the login request.
    #[error("Username and password are required")]
    MissingCredentials,

    /// Wrong password, unknown user or disabled account at login.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// No session token on a gated request.
    #[error("Authentication required")]
    SessionRequired,

    /// Token does not resolve to a live session.
    #[error("Invalid or expired session")]
    SessionInvalid,

    /// Session is live but its user has been deactivated.
    #[error("Account is disabled")]
    AccountDisabled,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
