//! Admin authentication service.
//!
//! Username/password login backed by server-side sessions with a fixed TTL.
//! The session token travels in the `admin_session` cookie or an
//! `Authorization: Bearer` header; see [`crate::middleware::auth`].

mod error;

pub use error::AuthError;

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::instrument;

use minh_phat_core::{AdminSession, AdminUser};

use crate::db::Store;

/// An authenticated admin and the session that proves it.
#[derive(Debug, Clone)]
pub struct CurrentAdmin {
    pub user: AdminUser,
    pub session: AdminSession,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: AdminUser,
    pub session: AdminSession,
}

/// Result of a session check that never fails.
#[derive(Debug, Clone)]
pub enum Verification {
    Authenticated(CurrentAdmin),
    Anonymous,
}

/// Authentication service.
pub struct AuthService<'a, S> {
    store: &'a S,
    session_ttl: TimeDelta,
}

impl<'a, S: Store> AuthService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S, session_ttl: TimeDelta) -> Self {
        Self { store, session_ttl }
    }

    /// Check credentials and open a session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingCredentials` if either field is blank.
    /// Returns `AuthError::InvalidCredentials` for an unknown user, a wrong
    /// password or a disabled account; no session is created.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let user = self
            .store
            .verify_password(username, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !user.is_active {
            tracing::info!(user_id = %user.id, "Login refused for disabled account");
            return Err(AuthError::InvalidCredentials);
        }

        let now = Utc::now();
        let session = self
            .store
            .create_session(&user.id, session_expiry(now, self.session_ttl))
            .await?;
        self.store.record_login(&user.id, now).await?;

        tracing::info!(user_id = %user.id, "Admin logged in");
        Ok(LoginOutcome { user, session })
    }

    /// End the session behind `token`, if any. Calling it twice is harmless.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the store fails.
    pub async fn logout(&self, token: Option<&str>) -> Result<(), AuthError> {
        if let Some(token) = token
            && self.store.delete_session(token).await?
        {
            tracing::info!("Admin logged out");
        }
        Ok(())
    }

    /// Resolve `token` without failing: anything short of a live session for
    /// an active user is anonymous.
    pub async fn verify(&self, token: Option<&str>) -> Verification {
        match self.authenticate(token).await {
            Ok(admin) => Verification::Authenticated(admin),
            Err(AuthError::Repository(e)) => {
                tracing::warn!(error = %e, "Session verification failed");
                Verification::Anonymous
            }
            Err(_) => Verification::Anonymous,
        }
    }

    /// Resolve `token` to the admin it belongs to.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SessionRequired` when there is no token,
    /// `AuthError::SessionInvalid` when it does not name a live session and
    /// `AuthError::AccountDisabled` when the user has been deactivated.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<CurrentAdmin, AuthError> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::SessionRequired)?;
        let session = self
            .store
            .session(token)
            .await?
            .ok_or(AuthError::SessionInvalid)?;
        let user = self
            .store
            .admin_user(&session.user_id)
            .await?
            .ok_or(AuthError::SessionInvalid)?;
        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }
        Ok(CurrentAdmin { user, session })
    }
}

fn session_expiry(now: DateTime<Utc>, ttl: TimeDelta) -> DateTime<Utc> {
    now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` on mismatch or an unparseable hash.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("minh-phat-timing-equalizer").ok());

/// Spend one verification's worth of work so unknown usernames take as long
/// as wrong passwords.
pub fn burn_verification(password: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use minh_phat_core::NewAdminUser;

    async fn store_with_admin(active: bool) -> MemoryStore {
        let store = MemoryStore::new();
        store
            .create_admin_user(NewAdminUser {
                username: "admin".to_string(),
                password_hash: hash_password("admin123").unwrap(),
                full_name: Some("Administrator".to_string()),
                email: None,
                is_active: active,
            })
            .await
            .unwrap();
        store
    }

    fn service(store: &MemoryStore) -> AuthService<'_, MemoryStore> {
        AuthService::new(store, TimeDelta::minutes(15))
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("admin123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("admin123", &hash).is_ok());
        assert!(matches!(
            verify_password("admin124", &hash),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(verify_password("admin123", "not-a-hash").is_err());
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(
            hash_password("admin123").unwrap(),
            hash_password("admin123").unwrap()
        );
    }

    #[tokio::test]
    async fn test_login_then_verify_resolves_same_user() {
        let store = store_with_admin(true).await;
        let auth = service(&store);

        let outcome = auth.login("admin", "admin123").await.unwrap();
        let ttl = outcome.session.expires_at - outcome.session.created_at;
        assert!(ttl <= TimeDelta::minutes(15) && ttl > TimeDelta::minutes(14));

        let Verification::Authenticated(admin) =
            auth.verify(Some(outcome.session.token.as_str())).await
        else {
            panic!("expected an authenticated session");
        };
        assert_eq!(admin.user.id, outcome.user.id);

        let user = store.admin_user(&outcome.user.id).await.unwrap().unwrap();
        assert!(user.last_login.is_some());
    }

    #[tokio::test]
    async fn test_login_rejections() {
        let store = store_with_admin(true).await;
        let auth = service(&store);

        assert!(matches!(
            auth.login("", "admin123").await,
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            auth.login("admin", "").await,
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            auth.login("admin", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody", "admin123").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert_eq!(store.session_count().await, 0);

        auth.login("admin", "admin123").await.unwrap();
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_disabled_account_cannot_log_in() {
        let store = store_with_admin(false).await;
        assert!(matches!(
            service(&store).login("admin", "admin123").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_authenticate_errors() {
        let store = store_with_admin(true).await;
        let auth = service(&store);

        assert!(matches!(
            auth.authenticate(None).await,
            Err(AuthError::SessionRequired)
        ));
        assert!(matches!(
            auth.authenticate(Some("")).await,
            Err(AuthError::SessionRequired)
        ));
        assert!(matches!(
            auth.authenticate(Some("deadbeef")).await,
            Err(AuthError::SessionInvalid)
        ));
    }

    #[tokio::test]
    async fn test_expired_session_is_anonymous() {
        let store = store_with_admin(true).await;
        let auth = AuthService::new(&store, TimeDelta::zero());
        let outcome = auth.login("admin", "admin123").await.unwrap();
        let token = outcome.session.token.as_str();

        assert!(matches!(auth.verify(Some(token)).await, Verification::Anonymous));
        assert!(matches!(
            auth.authenticate(Some(token)).await,
            Err(AuthError::SessionInvalid)
        ));
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let store = store_with_admin(true).await;
        let auth = service(&store);
        let outcome = auth.login("admin", "admin123").await.unwrap();
        let token = outcome.session.token.as_str();

        auth.logout(Some(token)).await.unwrap();
        auth.logout(Some(token)).await.unwrap();
        auth.logout(None).await.unwrap();
        assert!(matches!(auth.verify(Some(token)).await, Verification::Anonymous));
    }
}
