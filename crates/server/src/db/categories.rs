//! Category repository for SQLite.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use minh_phat_core::{
    Bilingual, Category, CategoryId, CategoryPatch, NewCategory, next_update_stamp,
};

use super::{RepositoryError, id_conflict, slug_conflict};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Selects every column plus the live product count, matching by id or slug.
const SELECT_CATEGORY: &str = "SELECT c.id, c.name_en, c.name_vi, c.description_en, \
     c.description_vi, c.slug, c.emoji, c.image, c.color, c.parent_id, c.sort_order, \
     c.is_active, c.created_at, c.updated_at, \
     (SELECT COUNT(*) FROM products p WHERE p.category = c.id OR p.category = c.slug) AS count \
     FROM categories c";

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: String,
    name_en: String,
    name_vi: String,
    description_en: String,
    description_vi: String,
    slug: String,
    emoji: Option<String>,
    image: Option<String>,
    color: Option<String>,
    parent_id: Option<String>,
    sort_order: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    count: i64,
}

impl TryFrom<CategoryRow> for Category {
    type Error = RepositoryError;

    fn try_from(row: CategoryRow) -> Result<Self, Self::Error> {
        let sort_order = i32::try_from(row.sort_order).map_err(|_| {
            RepositoryError::DataCorruption(format!("invalid sort order: {}", row.sort_order))
        })?;
        let count = u32::try_from(row.count).map_err(|_| {
            RepositoryError::DataCorruption(format!("invalid product count: {}", row.count))
        })?;

        Ok(Self {
            id: CategoryId::new(row.id),
            name: Bilingual::new(row.name_en, row.name_vi),
            description: Bilingual::new(row.description_en, row.description_vi),
            slug: row.slug,
            emoji: row.emoji,
            image: row.image,
            color: row.color,
            parent_id: row.parent_id.map(CategoryId::new),
            count,
            sort_order,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Categories by sort order then English name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, active_only: bool) -> Result<Vec<Category>, RepositoryError> {
        let rows: Vec<CategoryRow> = sqlx::query_as(&format!(
            "{SELECT_CATEGORY} WHERE (? = 0 OR c.is_active = 1) \
             ORDER BY c.sort_order ASC, c.name_en ASC, c.id ASC"
        ))
        .bind(active_only)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: &CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row: Option<CategoryRow> =
            sqlx::query_as(&format!("{SELECT_CATEGORY} WHERE c.id = ?"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        let row: Option<CategoryRow> =
            sqlx::query_as(&format!("{SELECT_CATEGORY} WHERE c.slug = ?"))
                .bind(slug)
                .fetch_optional(self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Whether `value` is already some other category's id or slug.
    async fn identifier_taken(
        &self,
        value: &str,
        except: Option<&CategoryId>,
    ) -> Result<bool, RepositoryError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE (id = ? OR slug = ?) AND id IS NOT ?)",
        )
        .bind(value)
        .bind(value)
        .bind(except)
        .fetch_one(self.pool)
        .await?;
        Ok(taken)
    }

    /// Insert a category, keeping a caller-supplied id or minting a UUID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the id or slug is already
    /// another category's id or slug.
    /// Returns `RepositoryError::Database` if the insert fails otherwise.
    pub async fn create(&self, input: NewCategory) -> Result<Category, RepositoryError> {
        let id = input
            .id
            .clone()
            .unwrap_or_else(|| CategoryId::new(Uuid::new_v4().to_string()));
        if self.identifier_taken(&input.slug, None).await? {
            return Err(slug_conflict(&input.slug));
        }
        if self.identifier_taken(id.as_str(), None).await? {
            return Err(id_conflict(&id));
        }
        let category = Category::from_input(id, input, Utc::now());

        sqlx::query(
            "INSERT INTO categories (id, name_en, name_vi, description_en, description_vi, \
             slug, emoji, image, color, parent_id, sort_order, is_active, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&category.id)
        .bind(&category.name.en)
        .bind(&category.name.vi)
        .bind(&category.description.en)
        .bind(&category.description.vi)
        .bind(&category.slug)
        .bind(&category.emoji)
        .bind(&category.image)
        .bind(&category.color)
        .bind(&category.parent_id)
        .bind(category.sort_order)
        .bind(category.is_active)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return slug_conflict(&category.slug);
            }
            RepositoryError::Database(e)
        })?;

        // Products may already reference the new slug.
        self.get_by_id(&category.id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Apply `patch` to the stored category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the new slug is another
    /// category's id or slug.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update(
        &self,
        id: &CategoryId,
        patch: CategoryPatch,
    ) -> Result<Option<Category>, RepositoryError> {
        let Some(mut category) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        if let Some(slug) = patch.slug.as_deref()
            && slug != category.slug
            && self.identifier_taken(slug, Some(id)).await?
        {
            return Err(slug_conflict(slug));
        }
        patch.apply_to(&mut category);
        category.updated_at = next_update_stamp(category.updated_at, Utc::now());

        sqlx::query(
            "UPDATE categories SET name_en = ?, name_vi = ?, description_en = ?, \
             description_vi = ?, slug = ?, emoji = ?, image = ?, color = ?, parent_id = ?, \
             sort_order = ?, is_active = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&category.name.en)
        .bind(&category.name.vi)
        .bind(&category.description.en)
        .bind(&category.description.vi)
        .bind(&category.slug)
        .bind(&category.emoji)
        .bind(&category.image)
        .bind(&category.color)
        .bind(&category.parent_id)
        .bind(category.sort_order)
        .bind(category.is_active)
        .bind(category.updated_at)
        .bind(&category.id)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return slug_conflict(&category.slug);
            }
            RepositoryError::Database(e)
        })?;

        // Re-read so the count reflects a slug change.
        self.get_by_id(id).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: &CategoryId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
