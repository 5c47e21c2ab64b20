//! Page content repository for SQLite.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use minh_phat_core::{
    Bilingual, Content, ContentId, ContentPatch, ContentType, NewContent, next_update_stamp,
};

use super::{ContentFilter, RepositoryError};

const CONTENT_COLUMNS: &str =
    "id, key, value_en, value_vi, content_type, section, sort_order, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ContentRow {
    id: String,
    key: String,
    value_en: String,
    value_vi: String,
    content_type: String,
    section: String,
    sort_order: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ContentRow> for Content {
    type Error = RepositoryError;

    fn try_from(row: ContentRow) -> Result<Self, Self::Error> {
        let content_type = ContentType::parse(&row.content_type).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("invalid content type: {}", row.content_type))
        })?;
        let sort_order = i32::try_from(row.sort_order).map_err(|_| {
            RepositoryError::DataCorruption(format!("invalid sort order: {}", row.sort_order))
        })?;

        Ok(Self {
            id: ContentId::new(row.id),
            key: row.key,
            value: Bilingual::new(row.value_en, row.value_vi),
            content_type,
            section: row.section,
            sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn slot_conflict(key: &str, section: &str) -> RepositoryError {
    RepositoryError::Conflict(format!(
        "Content with key '{key}' already exists in section '{section}'"
    ))
}

fn map_unique(e: sqlx::Error, key: &str, section: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return slot_conflict(key, section);
    }
    RepositoryError::Database(e)
}

/// Repository for content database operations.
pub struct ContentRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ContentRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Entries matching `filter`, ordered by section, sort order and key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &ContentFilter) -> Result<Vec<Content>, RepositoryError> {
        let mut query: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {CONTENT_COLUMNS} FROM content WHERE 1 = 1"));
        if let Some(section) = &filter.section {
            query.push(" AND section = ").push_bind(section.clone());
        }
        if let Some(key) = &filter.key {
            query.push(" AND key = ").push_bind(key.clone());
        }
        query.push(" ORDER BY section ASC, sort_order ASC, key ASC");

        let rows: Vec<ContentRow> = query.build_query_as().fetch_all(self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: &ContentId) -> Result<Option<Content>, RepositoryError> {
        let row: Option<ContentRow> = sqlx::query_as(&format!(
            "SELECT {CONTENT_COLUMNS} FROM content WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if `(key, section)` is taken.
    pub async fn create(&self, input: NewContent) -> Result<Content, RepositoryError> {
        let content = Content::from_input(
            ContentId::new(Uuid::new_v4().to_string()),
            input,
            Utc::now(),
        );

        sqlx::query(&format!(
            "INSERT INTO content ({CONTENT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&content.id)
        .bind(&content.key)
        .bind(&content.value.en)
        .bind(&content.value.vi)
        .bind(content.content_type.as_str())
        .bind(&content.section)
        .bind(content.sort_order)
        .bind(content.created_at)
        .bind(content.updated_at)
        .execute(self.pool)
        .await
        .map_err(|e| map_unique(e, &content.key, &content.section))?;

        Ok(content)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the resulting `(key, section)`
    /// belongs to another entry.
    pub async fn update(
        &self,
        id: &ContentId,
        patch: ContentPatch,
    ) -> Result<Option<Content>, RepositoryError> {
        let Some(mut content) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        patch.apply_to(&mut content);
        content.updated_at = next_update_stamp(content.updated_at, Utc::now());

        sqlx::query(
            "UPDATE content SET key = ?, value_en = ?, value_vi = ?, content_type = ?, \
             section = ?, sort_order = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&content.key)
        .bind(&content.value.en)
        .bind(&content.value.vi)
        .bind(content.content_type.as_str())
        .bind(&content.section)
        .bind(content.sort_order)
        .bind(content.updated_at)
        .bind(&content.id)
        .execute(self.pool)
        .await
        .map_err(|e| map_unique(e, &content.key, &content.section))?;

        Ok(Some(content))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: &ContentId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM content WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
