//! Product catalog handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use minh_phat_core::{CategoryId, NewProduct, Product, ProductId, ProductPatch};

use crate::db::{ProductFilter, Store};
use crate::error::AppError;
use crate::extract::{ValidJson, ValidQuery};
use crate::middleware::{AdminView, RequireAdmin};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: u32 = 12;
const MAX_PAGE_SIZE: u32 = 100;

pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route(
            "/api/products",
            get(list_products::<S>).post(create_product::<S>),
        )
        .route(
            "/api/products/{id}",
            get(get_product::<S>)
                .put(update_product::<S>)
                .delete(delete_product::<S>),
        )
        .route(
            "/api/products/category/{category_id}",
            get(products_in_category::<S>),
        )
}

/// Query parameters for `GET /api/products`.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub organic: Option<bool>,
    pub seasonal: Option<bool>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ProductQuery {
    fn filter(&self, admin_view: bool) -> ProductFilter {
        ProductFilter {
            category: self
                .category
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(ToOwned::to_owned),
            organic_only: self.organic == Some(true),
            seasonal_only: self.seasonal == Some(true),
            featured_only: self.featured == Some(true),
            in_stock_only: !admin_view,
        }
    }

    fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    fn limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }
}

/// One page of a product listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: usize,
    pub page: u32,
    pub limit: u32,
    pub total_pages: usize,
}

impl ProductPage {
    fn slice(all: Vec<Product>, page: u32, limit: u32) -> Self {
        let total = all.len();
        let per_page = limit as usize;
        let start = (page as usize - 1).saturating_mul(per_page);
        let products = all.into_iter().skip(start).take(per_page).collect();
        Self {
            products,
            total,
            page,
            limit,
            total_pages: total.div_ceil(per_page),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryProducts {
    pub products: Vec<Product>,
    pub total: usize,
    pub category_id: String,
}

/// `GET /api/products`
#[instrument(skip(state))]
pub async fn list_products<S: Store>(
    State(state): State<AppState<S>>,
    AdminView(admin_view): AdminView,
    ValidQuery(query): ValidQuery<ProductQuery>,
) -> Result<Json<ProductPage>, AppError> {
    let mut products = state
        .store()
        .list_products(&query.filter(admin_view))
        .await?;

    if let Some(needle) = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        let needle = needle.to_lowercase();
        products.retain(|p| p.matches_search(&needle));
    }

    if query.featured == Some(true) {
        products.sort_by(|a, b| b.rating.total_cmp(&a.rating));
    }

    Ok(Json(ProductPage::slice(
        products,
        query.page(),
        query.limit(),
    )))
}

/// `GET /api/products/{id}`
#[instrument(skip(state))]
pub async fn get_product<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<Product>, AppError> {
    state
        .store()
        .product(&ProductId::new(id))
        .await?
        .map(Json)
        .ok_or_else(product_not_found)
}

/// `GET /api/products/category/{category_id}`
///
/// Matches the stored category reference exactly, so pass whichever of id or
/// slug the products were created with.
#[instrument(skip(state))]
pub async fn products_in_category<S: Store>(
    State(state): State<AppState<S>>,
    AdminView(admin_view): AdminView,
    Path(category_id): Path<String>,
) -> Result<Json<CategoryProducts>, AppError> {
    let mut products = state.store().products_by_category(&category_id).await?;
    if !admin_view {
        products.retain(|p| p.in_stock);
    }
    Ok(Json(CategoryProducts {
        total: products.len(),
        products,
        category_id,
    }))
}

/// `POST /api/products`
#[instrument(skip(state, admin, input), fields(admin = %admin.user.username))]
pub async fn create_product<S: Store>(
    State(state): State<AppState<S>>,
    RequireAdmin(admin): RequireAdmin,
    ValidJson(input): ValidJson<NewProduct>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    input.validate()?;
    ensure_category_exists(state.store(), &input.category).await?;

    let product = state.store().create_product(input).await?;
    tracing::info!(product_id = %product.id, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// `PUT /api/products/{id}`
#[instrument(skip(state, admin, patch), fields(admin = %admin.user.username))]
pub async fn update_product<S: Store>(
    State(state): State<AppState<S>>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    ValidJson(patch): ValidJson<ProductPatch>,
) -> Result<Json<Product>, AppError> {
    patch.validate()?;
    let id = ProductId::new(id);

    if let Some(category) = patch.category.as_deref() {
        let current = state
            .store()
            .product(&id)
            .await?
            .ok_or_else(product_not_found)?;
        if current.category != category {
            ensure_category_exists(state.store(), category).await?;
        }
    }

    state
        .store()
        .update_product(&id, patch)
        .await?
        .map(Json)
        .ok_or_else(product_not_found)
}

/// `DELETE /api/products/{id}`
#[instrument(skip(state, admin), fields(admin = %admin.user.username))]
pub async fn delete_product<S: Store>(
    State(state): State<AppState<S>>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.store().delete_product(&ProductId::new(id)).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(product_not_found())
    }
}

/// A product's category reference must name an existing category by id or slug.
async fn ensure_category_exists<S: Store>(store: &S, reference: &str) -> Result<(), AppError> {
    let by_id = store
        .category(&CategoryId::new(reference))
        .await?;
    if by_id.is_some() || store.category_by_slug(reference).await?.is_some() {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Category '{reference}' does not exist"
        )))
    }
}

fn product_not_found() -> AppError {
    AppError::NotFound("Product not found".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(n: usize) -> Product {
        let input: NewProduct = serde_json::from_value(serde_json::json!({
            "name": {"en": format!("P{n}"), "vi": format!("SP{n}")},
            "price": 1.5,
            "category": "tropical"
        }))
        .unwrap();
        Product::from_input(ProductId::new(format!("p{n}")), input, Utc::now())
    }

    #[test]
    fn test_page_defaults_and_clamps() {
        let query = ProductQuery::default();
        assert_eq!(query.page(), 1);
        assert_eq!(query.limit(), DEFAULT_PAGE_SIZE);

        let query = ProductQuery {
            page: Some(0),
            limit: Some(500),
            ..ProductQuery::default()
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.limit(), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_slice_reports_full_total() {
        let all: Vec<Product> = (0..5).map(product).collect();
        let page = ProductPage::slice(all, 2, 2);
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
        let ids: Vec<_> = page.products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["p2", "p3"]);
    }

    #[test]
    fn test_slice_past_the_end_is_empty() {
        let all: Vec<Product> = (0..3).map(product).collect();
        let page = ProductPage::slice(all, 9, 12);
        assert!(page.products.is_empty());
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_filter_hides_out_of_stock_unless_admin() {
        let query = ProductQuery {
            organic: Some(true),
            category: Some("  ".to_string()),
            ..ProductQuery::default()
        };
        let public = query.filter(false);
        assert!(public.in_stock_only);
        assert!(public.organic_only);
        assert_eq!(public.category, None);
        assert!(!query.filter(true).in_stock_only);
    }
}
