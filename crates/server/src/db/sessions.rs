//! Admin session repository for SQLite.
//!
//! `expires_at` is kept as Unix epoch milliseconds so the sweep is a single
//! indexed numeric comparison.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use minh_phat_core::{AdminSession, AdminUserId, SessionId, SessionToken};

use super::{RepositoryError, new_session_token};

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: String,
    token: String,
    user_id: String,
    expires_at: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for AdminSession {
    type Error = RepositoryError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let expires_at = DateTime::from_timestamp_millis(row.expires_at).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("invalid session expiry: {}", row.expires_at))
        })?;

        Ok(Self {
            id: SessionId::new(row.id),
            token: SessionToken::new(row.token),
            user_id: AdminUserId::new(row.user_id),
            expires_at,
            created_at: row.created_at,
        })
    }
}

/// Repository for admin session database operations.
pub struct SessionRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SessionRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a session with a fresh token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Database` if the insert fails otherwise.
    pub async fn create(
        &self,
        user_id: &AdminUserId,
        expires_at: DateTime<Utc>,
    ) -> Result<AdminSession, RepositoryError> {
        let session = AdminSession {
            id: SessionId::new(Uuid::new_v4().to_string()),
            token: new_session_token(),
            user_id: user_id.clone(),
            expires_at,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO admin_sessions (id, token, user_id, expires_at, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&session.id)
        .bind(session.token.as_str())
        .bind(&session.user_id)
        .bind(session.expires_at.timestamp_millis())
        .bind(session.created_at)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        Ok(session)
    }

    /// The live session for `token`; an expired one is deleted and reported missing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_live(&self, token: &str) -> Result<Option<AdminSession>, RepositoryError> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT id, token, user_id, expires_at, created_at \
             FROM admin_sessions WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        let Some(session) = row.map(AdminSession::try_from).transpose()? else {
            return Ok(None);
        };
        if session.is_expired(Utc::now()) {
            self.delete(token).await?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, token: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM admin_sessions WHERE token = ?")
            .bind(token)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every session whose expiry has passed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_expired(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM admin_sessions WHERE expires_at <= ?")
            .bind(Utc::now().timestamp_millis())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
