//! Admin users and their sessions.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{AdminUserId, Email, SessionId};

/// A back-office user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: AdminUserId,
    pub username: String,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: Option<String>,
    pub email: Option<Email>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdminUser {
    #[must_use]
    pub fn from_input(id: AdminUserId, input: NewAdminUser, now: DateTime<Utc>) -> Self {
        Self {
            id,
            username: input.username,
            password_hash: input.password_hash,
            full_name: input.full_name,
            email: input.email,
            is_active: input.is_active,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The public projection returned by the auth endpoints.
    #[must_use]
    pub fn view(&self) -> AdminUserView {
        AdminUserView {
            id: self.id.clone(),
            username: self.username.clone(),
            full_name: self.full_name.clone(),
            email: self.email.clone(),
        }
    }
}

/// What clients get to see of an admin user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserView {
    pub id: AdminUserId,
    pub username: String,
    pub full_name: Option<String>,
    pub email: Option<Email>,
}

/// Input for creating an admin user. The password is already hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAdminUser {
    pub username: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub email: Option<Email>,
    pub is_active: bool,
}

/// Opaque bearer credential for an admin session.
///
/// `Debug` is redacted so tokens never reach the logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

/// A server-held login session with a fixed expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSession {
    pub id: SessionId,
    #[serde(skip_serializing)]
    pub token: SessionToken,
    pub user_id: AdminUserId,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl AdminSession {
    /// Expired sessions are indistinguishable from missing ones.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn admin() -> AdminUser {
        AdminUser::from_input(
            AdminUserId::new("u1"),
            NewAdminUser {
                username: "admin".to_string(),
                password_hash: "$argon2id$v=19$secret".to_string(),
                full_name: Some("Administrator".to_string()),
                email: Some(Email::parse("admin@minhphat.com").unwrap()),
                is_active: true,
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_password_hash_is_never_serialized() {
        let json = serde_json::to_string(&admin()).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("passwordHash"));
    }

    #[test]
    fn test_view_projection() {
        let view = admin().view();
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["username"], "admin");
        assert_eq!(value["fullName"], "Administrator");
    }

    #[test]
    fn test_session_expiry_boundary() {
        let now = Utc::now();
        let session = AdminSession {
            id: SessionId::new("s1"),
            token: SessionToken::new("abc"),
            user_id: AdminUserId::new("u1"),
            expires_at: now,
            created_at: now - TimeDelta::minutes(15),
        };
        assert!(session.is_expired(now));
        assert!(!session.is_expired(now - TimeDelta::seconds(1)));
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = SessionToken::new("deadbeef");
        assert!(!format!("{token:?}").contains("deadbeef"));
    }
}
