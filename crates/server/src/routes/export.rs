//! Full data export for backups.

use axum::{
    Json, Router,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use minh_phat_core::{Category, Content, Product, Subscriber};

use crate::db::{ContentFilter, ProductFilter, Store};
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Export format version, bumped when the document shape changes.
pub const EXPORT_VERSION: &str = "1.0";

const EXPORT_DISPOSITION: &str = r#"attachment; filename="minhphat-data-export.json""#;

pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new().route("/api/export", get(export_data::<S>))
}

/// Everything the store holds except admin accounts and sessions.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
    pub content: Vec<Content>,
    pub newsletters: Vec<Subscriber>,
    pub exported_at: DateTime<Utc>,
    pub version: &'static str,
}

/// `GET /api/export`
#[instrument(skip(state, admin), fields(admin = %admin.user.username))]
pub async fn export_data<S: Store>(
    State(state): State<AppState<S>>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Response, AppError> {
    let store = state.store();
    let document = ExportDocument {
        products: store.list_products(&ProductFilter::default()).await?,
        categories: store.list_categories(false).await?,
        content: store.list_content(&ContentFilter::default()).await?,
        newsletters: store.list_subscribers().await?,
        exported_at: Utc::now(),
        version: EXPORT_VERSION,
    };

    tracing::info!(
        products = document.products.len(),
        categories = document.categories.len(),
        "Data exported"
    );

    Ok((
        [(header::CONTENT_DISPOSITION, EXPORT_DISPOSITION)],
        Json(document),
    )
        .into_response())
}
