//! Product repository for SQLite.
//!
//! Prices are stored as decimal text; nutrition facts as a JSON document.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use minh_phat_core::{
    Bilingual, NewProduct, Nutrition, Price, Product, ProductId, ProductPatch, next_update_stamp,
};

use super::{ProductFilter, RepositoryError};

// =============================================================================
// Internal Row Types
// =============================================================================

const PRODUCT_COLUMNS: &str = "id, name_en, name_vi, description_en, description_vi, price, \
     original_price, image, category, unit, origin, badge_en, badge_vi, badge_color, in_stock, \
     rating, reviews_count, nutrition, organic, seasonal, featured, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    name_en: String,
    name_vi: String,
    description_en: String,
    description_vi: String,
    price: String,
    original_price: Option<String>,
    image: String,
    category: String,
    unit: Option<String>,
    origin: Option<String>,
    badge_en: Option<String>,
    badge_vi: Option<String>,
    badge_color: Option<String>,
    in_stock: bool,
    rating: f64,
    reviews_count: i64,
    nutrition: Option<String>,
    organic: bool,
    seasonal: bool,
    featured: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_price(raw: &str) -> Result<Price, RepositoryError> {
    raw.parse()
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid price '{raw}': {e}")))
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = parse_price(&row.price)?;
        let original_price = row.original_price.as_deref().map(parse_price).transpose()?;
        let nutrition = row
            .nutrition
            .as_deref()
            .map(serde_json::from_str::<Nutrition>)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid nutrition: {e}")))?;
        let reviews_count = u32::try_from(row.reviews_count).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "invalid review count: {}",
                row.reviews_count
            ))
        })?;
        let badge = match (row.badge_en, row.badge_vi) {
            (None, None) => None,
            (en, vi) => Some(Bilingual::new(
                en.unwrap_or_default(),
                vi.unwrap_or_default(),
            )),
        };

        Ok(Self {
            id: ProductId::new(row.id),
            name: Bilingual::new(row.name_en, row.name_vi),
            description: Bilingual::new(row.description_en, row.description_vi),
            price,
            original_price,
            image: row.image,
            category: row.category,
            unit: row.unit,
            origin: row.origin,
            badge,
            badge_color: row.badge_color,
            in_stock: row.in_stock,
            rating: row.rating,
            reviews_count,
            nutrition,
            organic: row.organic,
            seasonal: row.seasonal,
            featured: row.featured,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn nutrition_json(nutrition: Option<&Nutrition>) -> Result<Option<String>, RepositoryError> {
    nutrition
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| RepositoryError::DataCorruption(format!("unencodable nutrition: {e}")))
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Products matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a row cannot be decoded.
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let mut query: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE 1 = 1"));
        if let Some(category) = &filter.category {
            query.push(" AND category = ").push_bind(category.clone());
        }
        if filter.organic_only {
            query.push(" AND organic = 1");
        }
        if filter.seasonal_only {
            query.push(" AND seasonal = 1");
        }
        if filter.featured_only {
            query.push(" AND featured = 1");
        }
        if filter.in_stock_only {
            query.push(" AND in_stock = 1");
        }
        query.push(" ORDER BY created_at DESC, id DESC");

        let rows: Vec<ProductRow> = query.build_query_as().fetch_all(self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the row cannot be decoded.
    pub async fn get_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Insert a product under a fresh UUID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, input: NewProduct) -> Result<Product, RepositoryError> {
        let product = Product::from_input(
            ProductId::new(Uuid::new_v4().to_string()),
            input,
            Utc::now(),
        );
        self.insert(&product).await?;
        Ok(product)
    }

    async fn insert(&self, product: &Product) -> Result<(), RepositoryError> {
        sqlx::query(&format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&product.id)
        .bind(&product.name.en)
        .bind(&product.name.vi)
        .bind(&product.description.en)
        .bind(&product.description.vi)
        .bind(product.price.to_string())
        .bind(product.original_price.map(|p| p.to_string()))
        .bind(&product.image)
        .bind(&product.category)
        .bind(&product.unit)
        .bind(&product.origin)
        .bind(product.badge.as_ref().map(|b| b.en.clone()))
        .bind(product.badge.as_ref().map(|b| b.vi.clone()))
        .bind(&product.badge_color)
        .bind(product.in_stock)
        .bind(product.rating)
        .bind(i64::from(product.reviews_count))
        .bind(nutrition_json(product.nutrition.as_ref())?)
        .bind(product.organic)
        .bind(product.seasonal)
        .bind(product.featured)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Apply `patch` to the stored product.
    ///
    /// Returns `Ok(None)` if no product has that id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update(
        &self,
        id: &ProductId,
        patch: ProductPatch,
    ) -> Result<Option<Product>, RepositoryError> {
        let Some(mut product) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        patch.apply_to(&mut product);
        product.updated_at = next_update_stamp(product.updated_at, Utc::now());

        sqlx::query(
            "UPDATE products SET name_en = ?, name_vi = ?, description_en = ?, \
             description_vi = ?, price = ?, original_price = ?, image = ?, category = ?, \
             unit = ?, origin = ?, badge_en = ?, badge_vi = ?, badge_color = ?, in_stock = ?, \
             rating = ?, reviews_count = ?, nutrition = ?, organic = ?, seasonal = ?, \
             featured = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&product.name.en)
        .bind(&product.name.vi)
        .bind(&product.description.en)
        .bind(&product.description.vi)
        .bind(product.price.to_string())
        .bind(product.original_price.map(|p| p.to_string()))
        .bind(&product.image)
        .bind(&product.category)
        .bind(&product.unit)
        .bind(&product.origin)
        .bind(product.badge.as_ref().map(|b| b.en.clone()))
        .bind(product.badge.as_ref().map(|b| b.vi.clone()))
        .bind(&product.badge_color)
        .bind(product.in_stock)
        .bind(product.rating)
        .bind(i64::from(product.reviews_count))
        .bind(nutrition_json(product.nutrition.as_ref())?)
        .bind(product.organic)
        .bind(product.seasonal)
        .bind(product.featured)
        .bind(product.updated_at)
        .bind(&product.id)
        .execute(self.pool)
        .await?;

        Ok(Some(product))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: &ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
