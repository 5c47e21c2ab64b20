//! Page content handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use minh_phat_core::{Content, ContentId, ContentPatch, NewContent};

use crate::db::{ContentFilter, Store};
use crate::error::AppError;
use crate::extract::{ValidJson, ValidQuery};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route(
            "/api/content",
            get(list_content::<S>).post(create_content::<S>),
        )
        .route(
            "/api/content/{id}",
            get(get_content::<S>)
                .put(update_content::<S>)
                .delete(delete_content::<S>),
        )
        .route("/api/content/key/{key}", get(get_content_by_key::<S>))
        .route("/api/content/section/{section}", get(get_section::<S>))
}

#[derive(Debug, Default, Deserialize)]
pub struct ContentQuery {
    pub section: Option<String>,
    pub key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SectionQuery {
    pub section: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContentList {
    pub content: Vec<Content>,
}

#[derive(Debug, Serialize)]
pub struct SectionContent {
    pub content: Vec<Content>,
    pub section: String,
    pub total: usize,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// `GET /api/content?section=&key=`
#[instrument(skip(state))]
pub async fn list_content<S: Store>(
    State(state): State<AppState<S>>,
    ValidQuery(query): ValidQuery<ContentQuery>,
) -> Result<Json<ContentList>, AppError> {
    let filter = ContentFilter {
        section: non_blank(query.section),
        key: non_blank(query.key),
    };
    let content = state.store().list_content(&filter).await?;
    Ok(Json(ContentList { content }))
}

/// `GET /api/content/{id}`
#[instrument(skip(state))]
pub async fn get_content<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<Content>, AppError> {
    state
        .store()
        .content(&ContentId::new(id))
        .await?
        .map(Json)
        .ok_or_else(content_not_found)
}

/// `GET /api/content/key/{key}?section=`
///
/// Without a section the first entry with that key in listing order wins.
#[instrument(skip(state))]
pub async fn get_content_by_key<S: Store>(
    State(state): State<AppState<S>>,
    Path(key): Path<String>,
    ValidQuery(query): ValidQuery<SectionQuery>,
) -> Result<Json<Content>, AppError> {
    let section = non_blank(query.section);
    state
        .store()
        .content_by_key(&key, section.as_deref())
        .await?
        .map(Json)
        .ok_or_else(content_not_found)
}

/// `GET /api/content/section/{section}`
#[instrument(skip(state))]
pub async fn get_section<S: Store>(
    State(state): State<AppState<S>>,
    Path(section): Path<String>,
) -> Result<Json<SectionContent>, AppError> {
    let content = state.store().content_by_section(&section).await?;
    Ok(Json(SectionContent {
        total: content.len(),
        content,
        section,
    }))
}

/// `POST /api/content`
#[instrument(skip(state, admin, input), fields(admin = %admin.user.username))]
pub async fn create_content<S: Store>(
    State(state): State<AppState<S>>,
    RequireAdmin(admin): RequireAdmin,
    ValidJson(input): ValidJson<NewContent>,
) -> Result<(StatusCode, Json<Content>), AppError> {
    input.validate()?;
    let content = state.store().create_content(input).await?;
    tracing::info!(content_id = %content.id, key = %content.key, "Content created");
    Ok((StatusCode::CREATED, Json(content)))
}

/// `PUT /api/content/{id}`
#[instrument(skip(state, admin, patch), fields(admin = %admin.user.username))]
pub async fn update_content<S: Store>(
    State(state): State<AppState<S>>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    ValidJson(patch): ValidJson<ContentPatch>,
) -> Result<Json<Content>, AppError> {
    patch.validate()?;
    state
        .store()
        .update_content(&ContentId::new(id), patch)
        .await?
        .map(Json)
        .ok_or_else(content_not_found)
}

/// `DELETE /api/content/{id}`
#[instrument(skip(state, admin), fields(admin = %admin.user.username))]
pub async fn delete_content<S: Store>(
    State(state): State<AppState<S>>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.store().delete_content(&ContentId::new(id)).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(content_not_found())
    }
}

fn content_not_found() -> AppError {
    AppError::NotFound("Content not found".to_string())
}
