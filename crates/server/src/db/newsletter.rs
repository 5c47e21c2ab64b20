//! Newsletter subscriber repository for SQLite.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use minh_phat_core::{
    Email, Language, NewSubscription, Subscribed, Subscriber, SubscriberId, SubscriptionStatus,
    next_update_stamp,
};

use super::RepositoryError;

const SUBSCRIBER_COLUMNS: &str = "id, email, name, language, status, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct SubscriberRow {
    id: String,
    email: String,
    name: Option<String>,
    language: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriberRow> for Subscriber {
    type Error = RepositoryError;

    fn try_from(row: SubscriberRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let language = Language::from_code(&row.language).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("invalid language: {}", row.language))
        })?;
        let status = SubscriptionStatus::parse(&row.status).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("invalid status: {}", row.status))
        })?;

        Ok(Self {
            id: SubscriberId::new(row.id),
            email,
            name: row.name,
            language,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for newsletter database operations.
pub struct NewsletterRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> NewsletterRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// All subscribers, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Subscriber>, RepositoryError> {
        let rows: Vec<SubscriberRow> = sqlx::query_as(&format!(
            "SELECT {SUBSCRIBER_COLUMNS} FROM newsletters ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<Subscriber>, RepositoryError> {
        let row: Option<SubscriberRow> = sqlx::query_as(&format!(
            "SELECT {SUBSCRIBER_COLUMNS} FROM newsletters WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Insert a subscriber, or refresh the existing row for the same email.
    ///
    /// A concurrent first subscription for the same email surfaces as a
    /// unique violation on insert; the loser refreshes the winner's row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn subscribe(&self, input: NewSubscription) -> Result<Subscribed, RepositoryError> {
        if let Some(existing) = self.get_by_email(&input.email).await? {
            return self.refresh(existing, input).await.map(Subscribed::Updated);
        }

        match self.insert(&input).await {
            Ok(subscriber) => Ok(Subscribed::Created(subscriber)),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                let existing = self
                    .get_by_email(&input.email)
                    .await?
                    .ok_or(RepositoryError::NotFound)?;
                self.refresh(existing, input).await.map(Subscribed::Updated)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn insert(&self, input: &NewSubscription) -> Result<Subscriber, sqlx::Error> {
        let now = Utc::now();
        let subscriber = Subscriber {
            id: SubscriberId::new(Uuid::new_v4().to_string()),
            email: input.email.clone(),
            name: input.name.clone(),
            language: input.language,
            status: SubscriptionStatus::Active,
            created_at: now,
            updated_at: now,
        };
        sqlx::query(&format!(
            "INSERT INTO newsletters ({SUBSCRIBER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&subscriber.id)
        .bind(&subscriber.email)
        .bind(&subscriber.name)
        .bind(subscriber.language.code())
        .bind(subscriber.status.as_str())
        .bind(subscriber.created_at)
        .bind(subscriber.updated_at)
        .execute(self.pool)
        .await?;

        Ok(subscriber)
    }

    async fn refresh(
        &self,
        mut existing: Subscriber,
        input: NewSubscription,
    ) -> Result<Subscriber, RepositoryError> {
        input.refresh(&mut existing);
        existing.updated_at = next_update_stamp(existing.updated_at, Utc::now());
        sqlx::query(
            "UPDATE newsletters SET name = ?, language = ?, status = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(&existing.name)
        .bind(existing.language.code())
        .bind(existing.status.as_str())
        .bind(existing.updated_at)
        .bind(&existing.id)
        .execute(self.pool)
        .await?;
        Ok(existing)
    }
}
