//! Category handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde::Serialize;
use tracing::instrument;

use minh_phat_core::{Category, CategoryId, CategoryPatch, NewCategory};

use crate::db::Store;
use crate::error::AppError;
use crate::extract::ValidJson;
use crate::middleware::{AdminView, RequireAdmin};
use crate::state::AppState;

pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route(
            "/api/categories",
            get(list_categories::<S>).post(create_category::<S>),
        )
        .route(
            "/api/categories/{id}",
            get(get_category::<S>)
                .put(update_category::<S>)
                .delete(delete_category::<S>),
        )
        .route(
            "/api/categories/slug/{slug}",
            get(get_category_by_slug::<S>),
        )
}

#[derive(Debug, Serialize)]
pub struct CategoryList {
    pub categories: Vec<Category>,
}

/// `GET /api/categories`
#[instrument(skip(state))]
pub async fn list_categories<S: Store>(
    State(state): State<AppState<S>>,
    AdminView(admin_view): AdminView,
) -> Result<Json<CategoryList>, AppError> {
    let categories = state.store().list_categories(!admin_view).await?;
    Ok(Json(CategoryList { categories }))
}

/// `GET /api/categories/{id}`
#[instrument(skip(state))]
pub async fn get_category<S: Store>(
    State(state): State<AppState<S>>,
    AdminView(admin_view): AdminView,
    Path(id): Path<String>,
) -> Result<Json<Category>, AppError> {
    let category = state.store().category(&CategoryId::new(id)).await?;
    visible(category, admin_view).map(Json)
}

/// `GET /api/categories/slug/{slug}`
#[instrument(skip(state))]
pub async fn get_category_by_slug<S: Store>(
    State(state): State<AppState<S>>,
    AdminView(admin_view): AdminView,
    Path(slug): Path<String>,
) -> Result<Json<Category>, AppError> {
    let category = state.store().category_by_slug(&slug).await?;
    visible(category, admin_view).map(Json)
}

/// `POST /api/categories`
#[instrument(skip(state, admin, input), fields(admin = %admin.user.username))]
pub async fn create_category<S: Store>(
    State(state): State<AppState<S>>,
    RequireAdmin(admin): RequireAdmin,
    ValidJson(input): ValidJson<NewCategory>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    input.validate()?;
    let category = state.store().create_category(input).await?;
    tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// `PUT /api/categories/{id}`
///
/// The slug cannot change while products still reference the old one.
#[instrument(skip(state, admin, patch), fields(admin = %admin.user.username))]
pub async fn update_category<S: Store>(
    State(state): State<AppState<S>>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    ValidJson(patch): ValidJson<CategoryPatch>,
) -> Result<Json<Category>, AppError> {
    patch.validate()?;
    let id = CategoryId::new(id);
    let store = state.store();

    if let Some(slug) = patch.slug.as_deref() {
        let current = store.category(&id).await?.ok_or_else(category_not_found)?;
        if slug != current.slug
            && !store
                .products_by_category(&current.slug)
                .await?
                .is_empty()
        {
            return Err(AppError::BadRequest(format!(
                "Cannot change slug '{}' while products reference it. Move those products first.",
                current.slug
            )));
        }
    }

    store
        .update_category(&id, patch)
        .await?
        .map(Json)
        .ok_or_else(category_not_found)
}

/// `DELETE /api/categories/{id}`
///
/// Refused while any product still points at the category by id or slug.
#[instrument(skip(state, admin), fields(admin = %admin.user.username))]
pub async fn delete_category<S: Store>(
    State(state): State<AppState<S>>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = CategoryId::new(id);
    let store = state.store();
    let category = store.category(&id).await?.ok_or_else(category_not_found)?;

    let by_id = store.products_by_category(category.id.as_str()).await?;
    let by_slug = store.products_by_category(&category.slug).await?;
    if !by_id.is_empty() || !by_slug.is_empty() {
        return Err(AppError::BadRequest(
            "Cannot delete category with existing products. Move or delete products first."
                .to_string(),
        ));
    }

    if store.delete_category(&id).await? {
        tracing::info!(category_id = %id, "Category deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(category_not_found())
    }
}

/// Inactive categories only show up in the admin view.
fn visible(category: Option<Category>, admin_view: bool) -> Result<Category, AppError> {
    category
        .filter(|c| admin_view || c.is_active)
        .ok_or_else(category_not_found)
}

fn category_not_found() -> AppError {
    AppError::NotFound("Category not found".to_string())
}
