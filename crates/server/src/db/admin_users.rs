//! Admin user repository for SQLite.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use minh_phat_core::{AdminUser, AdminUserId, Email, NewAdminUser, next_update_stamp};

use super::RepositoryError;

const ADMIN_USER_COLUMNS: &str =
    "id, username, password_hash, full_name, email, is_active, last_login, created_at, updated_at";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct AdminUserRow {
    id: String,
    username: String,
    password_hash: String,
    full_name: Option<String>,
    email: Option<String>,
    is_active: bool,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AdminUserRow> for AdminUser {
    type Error = RepositoryError;

    fn try_from(row: AdminUserRow) -> Result<Self, Self::Error> {
        let email = row
            .email
            .as_deref()
            .map(Email::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
            })?;

        Ok(Self {
            id: AdminUserId::new(row.id),
            username: row.username,
            password_hash: row.password_hash,
            full_name: row.full_name,
            email,
            is_active: row.is_active,
            last_login: row.last_login,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for admin user database operations.
pub struct AdminUserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AdminUserRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List all admin users by username.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn list_all(&self) -> Result<Vec<AdminUser>, RepositoryError> {
        let rows: Vec<AdminUserRow> = sqlx::query_as(&format!(
            "SELECT {ADMIN_USER_COLUMNS} FROM admin_users ORDER BY username ASC"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_by_id(&self, id: &AdminUserId) -> Result<Option<AdminUser>, RepositoryError> {
        let row: Option<AdminUserRow> = sqlx::query_as(&format!(
            "SELECT {ADMIN_USER_COLUMNS} FROM admin_users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AdminUser>, RepositoryError> {
        let row: Option<AdminUserRow> = sqlx::query_as(&format!(
            "SELECT {ADMIN_USER_COLUMNS} FROM admin_users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Create a new admin user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username already exists.
    /// Returns `RepositoryError::Database` if the insert fails otherwise.
    pub async fn create(&self, input: NewAdminUser) -> Result<AdminUser, RepositoryError> {
        let user = AdminUser::from_input(
            AdminUserId::new(Uuid::new_v4().to_string()),
            input,
            Utc::now(),
        );

        sqlx::query(&format!(
            "INSERT INTO admin_users ({ADMIN_USER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(user.is_active)
        .bind(user.last_login)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict(format!(
                    "Admin user '{}' already exists",
                    user.username
                ));
            }
            RepositoryError::Database(e)
        })?;

        Ok(user)
    }

    /// Stamp a successful login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn record_login(
        &self,
        id: &AdminUserId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let user = self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)?;
        let updated_at = next_update_stamp(user.updated_at, at);

        sqlx::query("UPDATE admin_users SET last_login = ?, updated_at = ? WHERE id = ?")
            .bind(at)
            .bind(updated_at)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Delete a user. Sessions go with it through the foreign key cascade.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: &AdminUserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM admin_users WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
