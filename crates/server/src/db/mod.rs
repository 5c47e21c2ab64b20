//! Data store contract and its two backends.
//!
//! # Backends
//!
//! - [`MemoryStore`] - process-lifetime maps, reseeded at startup
//! - [`SqliteStore`] - file-backed SQLite through an sqlx pool
//!
//! Both implement [`Store`]; the server picks one at startup (`MINHPHAT_STORE`)
//! and hands it to the router. Handlers never know which one they talk to.
//!
//! # Migrations
//!
//! SQLite migrations live in `crates/server/migrations/`. They are embedded in
//! the binary and applied by [`SqliteStore::connect`] or explicitly via:
//! ```bash
//! cargo run -p minh-phat-cli -- migrate
//! ```
//!
//! # Referential integrity
//!
//! Stores do not check that a product's category exists, and they delete
//! categories that still have products. Both guards live in the REST layer;
//! anything calling a store directly bypasses them.

pub mod admin_users;
pub mod categories;
pub mod content;
pub mod memory;
pub mod newsletter;
pub mod products;
pub mod seed;
pub mod sessions;
pub mod sqlite;

use std::future::Future;

use chrono::{DateTime, Utc};
use rand::RngCore;
use thiserror::Error;

use minh_phat_core::{
    AdminSession, AdminUser, AdminUserId, Category, CategoryId, CategoryPatch, Content, ContentId,
    ContentPatch, NewAdminUser, NewCategory, NewContent, NewProduct, NewSubscription, Product,
    ProductId, ProductPatch, SessionToken, Subscribed, Subscriber,
};

pub use memory::MemoryStore;
pub use sqlite::{SqliteStore, create_pool};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Applying embedded migrations failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate slug).
    #[error("{0}")]
    Conflict(String),
}

fn slug_conflict(slug: &str) -> RepositoryError {
    RepositoryError::Conflict(format!("Category with slug or id '{slug}' already exists"))
}

fn id_conflict(id: &CategoryId) -> RepositoryError {
    RepositoryError::Conflict(format!("Category with id or slug '{id}' already exists"))
}

/// Equality filters for product listings. `None`/`false` means "don't filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Category id or slug, matched exactly against `Product::category`.
    pub category: Option<String>,
    pub organic_only: bool,
    pub seasonal_only: bool,
    pub featured_only: bool,
    pub in_stock_only: bool,
}

impl ProductFilter {
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.category
            .as_deref()
            .is_none_or(|category| product.category == category)
            && (!self.organic_only || product.organic)
            && (!self.seasonal_only || product.seasonal)
            && (!self.featured_only || product.featured)
            && (!self.in_stock_only || product.in_stock)
    }
}

/// Equality filters for content listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentFilter {
    pub section: Option<String>,
    pub key: Option<String>,
}

impl ContentFilter {
    #[must_use]
    pub fn matches(&self, content: &Content) -> bool {
        self.section.as_deref().is_none_or(|s| content.section == s)
            && self.key.as_deref().is_none_or(|k| content.key == k)
    }
}

/// The storage contract shared by every backend.
///
/// Lookups return `Ok(None)` (or `false` for deletes) when the entity does not
/// exist; `Err` is reserved for constraint violations and backend failures.
pub trait Store: Send + Sync + 'static {
    // ---------------------------------------------------------------- products

    /// Products matching `filter`, newest first.
    fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> impl Future<Output = Result<Vec<Product>, RepositoryError>> + Send;

    fn product(
        &self,
        id: &ProductId,
    ) -> impl Future<Output = Result<Option<Product>, RepositoryError>> + Send;

    /// Products whose `category` field equals `category` exactly.
    fn products_by_category(
        &self,
        category: &str,
    ) -> impl Future<Output = Result<Vec<Product>, RepositoryError>> + Send;

    fn create_product(
        &self,
        input: NewProduct,
    ) -> impl Future<Output = Result<Product, RepositoryError>> + Send;

    fn update_product(
        &self,
        id: &ProductId,
        patch: ProductPatch,
    ) -> impl Future<Output = Result<Option<Product>, RepositoryError>> + Send;

    fn delete_product(
        &self,
        id: &ProductId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    // -------------------------------------------------------------- categories

    /// Categories ordered by sort order then English name, with live counts.
    fn list_categories(
        &self,
        active_only: bool,
    ) -> impl Future<Output = Result<Vec<Category>, RepositoryError>> + Send;

    fn category(
        &self,
        id: &CategoryId,
    ) -> impl Future<Output = Result<Option<Category>, RepositoryError>> + Send;

    fn category_by_slug(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<Option<Category>, RepositoryError>> + Send;

    /// Fails with [`RepositoryError::Conflict`] when the id or the slug is
    /// already used as any category's id or slug.
    fn create_category(
        &self,
        input: NewCategory,
    ) -> impl Future<Output = Result<Category, RepositoryError>> + Send;

    /// Fails with [`RepositoryError::Conflict`] when the new slug is another
    /// category's id or slug.
    fn update_category(
        &self,
        id: &CategoryId,
        patch: CategoryPatch,
    ) -> impl Future<Output = Result<Option<Category>, RepositoryError>> + Send;

    fn delete_category(
        &self,
        id: &CategoryId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    // ----------------------------------------------------------------- content

    /// Content matching `filter`, ordered by section, sort order and key.
    fn list_content(
        &self,
        filter: &ContentFilter,
    ) -> impl Future<Output = Result<Vec<Content>, RepositoryError>> + Send;

    fn content(
        &self,
        id: &ContentId,
    ) -> impl Future<Output = Result<Option<Content>, RepositoryError>> + Send;

    /// The entry for `key` in `section`, or the first entry with that key in
    /// listing order when no section is given.
    fn content_by_key(
        &self,
        key: &str,
        section: Option<&str>,
    ) -> impl Future<Output = Result<Option<Content>, RepositoryError>> + Send;

    fn content_by_section(
        &self,
        section: &str,
    ) -> impl Future<Output = Result<Vec<Content>, RepositoryError>> + Send;

    /// Fails with [`RepositoryError::Conflict`] when `(key, section)` is taken.
    fn create_content(
        &self,
        input: NewContent,
    ) -> impl Future<Output = Result<Content, RepositoryError>> + Send;

    /// Fails with [`RepositoryError::Conflict`] when the resulting
    /// `(key, section)` belongs to another entry.
    fn update_content(
        &self,
        id: &ContentId,
        patch: ContentPatch,
    ) -> impl Future<Output = Result<Option<Content>, RepositoryError>> + Send;

    fn delete_content(
        &self,
        id: &ContentId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    // -------------------------------------------------------------- newsletter

    /// Subscribe an email, refreshing the existing row when it is already on file.
    fn subscribe(
        &self,
        input: NewSubscription,
    ) -> impl Future<Output = Result<Subscribed, RepositoryError>> + Send;

    /// All subscribers, newest first.
    fn list_subscribers(
        &self,
    ) -> impl Future<Output = Result<Vec<Subscriber>, RepositoryError>> + Send;

    // ------------------------------------------------------------- admin users

    /// Fails with [`RepositoryError::Conflict`] on a duplicate username.
    fn create_admin_user(
        &self,
        input: NewAdminUser,
    ) -> impl Future<Output = Result<AdminUser, RepositoryError>> + Send;

    fn admin_user(
        &self,
        id: &AdminUserId,
    ) -> impl Future<Output = Result<Option<AdminUser>, RepositoryError>> + Send;

    fn admin_user_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<AdminUser>, RepositoryError>> + Send;

    fn list_admin_users(
        &self,
    ) -> impl Future<Output = Result<Vec<AdminUser>, RepositoryError>> + Send;

    fn record_login(
        &self,
        id: &AdminUserId,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Deletes the user and every session they own.
    fn delete_admin_user(
        &self,
        id: &AdminUserId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// The user named `username` if `password` matches their hash.
    ///
    /// Unknown usernames still pay for one hash verification.
    fn verify_password(
        &self,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<Option<AdminUser>, RepositoryError>> + Send {
        async move {
            let user = self.admin_user_by_username(username).await?;
            let Some(user) = user else {
                crate::services::auth::burn_verification(password);
                return Ok(None);
            };
            if crate::services::auth::verify_password(password, &user.password_hash).is_ok() {
                Ok(Some(user))
            } else {
                Ok(None)
            }
        }
    }

    // ---------------------------------------------------------------- sessions

    /// Open a session for `user_id` that expires at `expires_at`.
    fn create_session(
        &self,
        user_id: &AdminUserId,
        expires_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<AdminSession, RepositoryError>> + Send;

    /// The live session for `token`. An expired session is deleted on the spot
    /// and reported as missing.
    fn session(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Option<AdminSession>, RepositoryError>> + Send;

    fn delete_session(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Remove every expired session and return how many went.
    fn sweep_expired_sessions(
        &self,
    ) -> impl Future<Output = Result<u64, RepositoryError>> + Send;

    // ------------------------------------------------------------------ health

    /// Cheap round trip to the backend for readiness probes.
    fn ping(&self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// A fresh 256-bit session token, hex encoded.
#[must_use]
pub fn new_session_token() -> SessionToken {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    SessionToken::new(hex::encode(bytes))
}

/// Fill in `count` for each category from `products`.
pub(crate) fn attach_counts(categories: &mut [Category], products: &[Product]) {
    for category in categories {
        category.count = count_products(category, products);
    }
}

pub(crate) fn count_products(category: &Category, products: &[Product]) -> u32 {
    let n = products
        .iter()
        .filter(|p| p.belongs_to(category.id.as_str(), &category.slug))
        .count();
    u32::try_from(n).unwrap_or(u32::MAX)
}
