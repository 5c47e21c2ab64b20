//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Readiness (store ping)
//!
//! # Products
//! GET  /api/products                    - Filtered, paginated listing
//! GET  /api/products/{id}               - Product detail
//! GET  /api/products/category/{id}      - Products referencing a category
//! POST /api/products                    - Create (admin)
//! PUT  /api/products/{id}               - Partial update (admin)
//! DELETE /api/products/{id}             - Delete (admin)
//!
//! # Categories
//! GET  /api/categories                  - Listing with live counts
//! GET  /api/categories/{id}             - Category detail
//! GET  /api/categories/slug/{slug}      - Lookup by slug
//! POST|PUT|DELETE /api/categories[/{id}] - Mutations (admin)
//!
//! # Content
//! GET  /api/content?section=&key=       - Listing
//! GET  /api/content/{id}                - Entry detail
//! GET  /api/content/key/{key}?section=  - Lookup by key
//! GET  /api/content/section/{section}   - A whole section
//! POST|PUT|DELETE /api/content[/{id}]   - Mutations (admin)
//!
//! # Newsletter
//! POST /api/newsletter/subscribe        - Signup or refresh
//!
//! # Auth
//! POST /api/auth/login                  - Password login
//! POST /api/auth/logout                 - End session
//! GET  /api/auth/verify                 - Session status
//!
//! # Export
//! GET  /api/export                      - Full JSON export (admin)
//! ```

pub mod auth;
pub mod categories;
pub mod content;
pub mod export;
pub mod health;
pub mod newsletter;
pub mod products;

use axum::Router;

use crate::db::Store;
use crate::state::AppState;

/// Build the complete router for every route above.
pub fn routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .merge(health::router())
        .merge(products::router())
        .merge(categories::router())
        .merge(content::router())
        .merge(newsletter::router())
        .merge(auth::router())
        .merge(export::router())
}
