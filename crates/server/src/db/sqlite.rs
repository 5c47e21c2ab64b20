//! SQLite-backed [`Store`].

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use sqlx::SqlitePool;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use minh_phat_core::{
    AdminSession, AdminUser, AdminUserId, Category, CategoryId, CategoryPatch, Content, ContentId,
    ContentPatch, NewAdminUser, NewCategory, NewContent, NewProduct, NewSubscription, Product,
    ProductId, ProductPatch, Subscribed, Subscriber,
};

use super::admin_users::AdminUserRepository;
use super::categories::CategoryRepository;
use super::content::ContentRepository;
use super::newsletter::NewsletterRepository;
use super::products::ProductRepository;
use super::sessions::SessionRepository;
use super::{ContentFilter, ProductFilter, RepositoryError, Store};

/// Schema migrations embedded from `crates/server/migrations/`.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Create an SQLite connection pool.
///
/// The database file is created if missing. Foreign keys are enforced so
/// deleting an admin user removes their sessions.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is invalid or the file cannot be opened.
pub async fn create_pool(database_url: &SecretString) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url.expose_secret())?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}

/// [`Store`] over an SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Wrap an existing pool. Migrations are not run.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database at `database_url` and bring its schema up to date.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the connection fails and
    /// `RepositoryError::Migration` if a migration fails.
    pub async fn connect(database_url: &SecretString) -> Result<Self, RepositoryError> {
        let pool = create_pool(database_url).await?;
        MIGRATOR.run(&pool).await?;
        Ok(Self::new(pool))
    }

    /// A private, migrated in-memory database.
    ///
    /// A single connection that never recycles, since each new connection to
    /// `sqlite::memory:` would see an empty database.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` or `RepositoryError::Migration` on failure.
    pub async fn in_memory() -> Result<Self, RepositoryError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        MIGRATOR.run(&pool).await?;
        Ok(Self::new(pool))
    }

    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    const fn products(&self) -> ProductRepository<'_> {
        ProductRepository::new(&self.pool)
    }

    const fn categories(&self) -> CategoryRepository<'_> {
        CategoryRepository::new(&self.pool)
    }

    const fn content_repo(&self) -> ContentRepository<'_> {
        ContentRepository::new(&self.pool)
    }

    const fn newsletter(&self) -> NewsletterRepository<'_> {
        NewsletterRepository::new(&self.pool)
    }

    const fn admin_users(&self) -> AdminUserRepository<'_> {
        AdminUserRepository::new(&self.pool)
    }

    const fn sessions(&self) -> SessionRepository<'_> {
        SessionRepository::new(&self.pool)
    }
}

impl Store for SqliteStore {
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        self.products().list(filter).await
    }

    async fn product(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        self.products().get_by_id(id).await
    }

    async fn products_by_category(&self, category: &str) -> Result<Vec<Product>, RepositoryError> {
        let filter = ProductFilter {
            category: Some(category.to_owned()),
            ..ProductFilter::default()
        };
        self.products().list(&filter).await
    }

    async fn create_product(&self, input: NewProduct) -> Result<Product, RepositoryError> {
        self.products().create(input).await
    }

    async fn update_product(
        &self,
        id: &ProductId,
        patch: ProductPatch,
    ) -> Result<Option<Product>, RepositoryError> {
        self.products().update(id, patch).await
    }

    async fn delete_product(&self, id: &ProductId) -> Result<bool, RepositoryError> {
        self.products().delete(id).await
    }

    async fn list_categories(&self, active_only: bool) -> Result<Vec<Category>, RepositoryError> {
        self.categories().list(active_only).await
    }

    async fn category(&self, id: &CategoryId) -> Result<Option<Category>, RepositoryError> {
        self.categories().get_by_id(id).await
    }

    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        self.categories().get_by_slug(slug).await
    }

    async fn create_category(&self, input: NewCategory) -> Result<Category, RepositoryError> {
        self.categories().create(input).await
    }

    async fn update_category(
        &self,
        id: &CategoryId,
        patch: CategoryPatch,
    ) -> Result<Option<Category>, RepositoryError> {
        self.categories().update(id, patch).await
    }

    async fn delete_category(&self, id: &CategoryId) -> Result<bool, RepositoryError> {
        self.categories().delete(id).await
    }

    async fn list_content(&self, filter: &ContentFilter) -> Result<Vec<Content>, RepositoryError> {
        self.content_repo().list(filter).await
    }

    async fn content(&self, id: &ContentId) -> Result<Option<Content>, RepositoryError> {
        self.content_repo().get_by_id(id).await
    }

    async fn content_by_key(
        &self,
        key: &str,
        section: Option<&str>,
    ) -> Result<Option<Content>, RepositoryError> {
        let filter = ContentFilter {
            section: section.map(ToOwned::to_owned),
            key: Some(key.to_owned()),
        };
        Ok(self.content_repo().list(&filter).await?.into_iter().next())
    }

    async fn content_by_section(&self, section: &str) -> Result<Vec<Content>, RepositoryError> {
        let filter = ContentFilter {
            section: Some(section.to_owned()),
            key: None,
        };
        self.content_repo().list(&filter).await
    }

    async fn create_content(&self, input: NewContent) -> Result<Content, RepositoryError> {
        self.content_repo().create(input).await
    }

    async fn update_content(
        &self,
        id: &ContentId,
        patch: ContentPatch,
    ) -> Result<Option<Content>, RepositoryError> {
        self.content_repo().update(id, patch).await
    }

    async fn delete_content(&self, id: &ContentId) -> Result<bool, RepositoryError> {
        self.content_repo().delete(id).await
    }

    async fn subscribe(&self, input: NewSubscription) -> Result<Subscribed, RepositoryError> {
        self.newsletter().subscribe(input).await
    }

    async fn list_subscribers(&self) -> Result<Vec<Subscriber>, RepositoryError> {
        self.newsletter().list().await
    }

    async fn create_admin_user(&self, input: NewAdminUser) -> Result<AdminUser, RepositoryError> {
        self.admin_users().create(input).await
    }

    async fn admin_user(&self, id: &AdminUserId) -> Result<Option<AdminUser>, RepositoryError> {
        self.admin_users().get_by_id(id).await
    }

    async fn admin_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AdminUser>, RepositoryError> {
        self.admin_users().get_by_username(username).await
    }

    async fn list_admin_users(&self) -> Result<Vec<AdminUser>, RepositoryError> {
        self.admin_users().list_all().await
    }

    async fn record_login(&self, id: &AdminUserId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        self.admin_users().record_login(id, at).await
    }

    async fn delete_admin_user(&self, id: &AdminUserId) -> Result<bool, RepositoryError> {
        self.admin_users().delete(id).await
    }

    async fn create_session(
        &self,
        user_id: &AdminUserId,
        expires_at: DateTime<Utc>,
    ) -> Result<AdminSession, RepositoryError> {
        self.sessions().create(user_id, expires_at).await
    }

    async fn session(&self, token: &str) -> Result<Option<AdminSession>, RepositoryError> {
        self.sessions().get_live(token).await
    }

    async fn delete_session(&self, token: &str) -> Result<bool, RepositoryError> {
        self.sessions().delete(token).await
    }

    async fn sweep_expired_sessions(&self) -> Result<u64, RepositoryError> {
        self.sessions().delete_expired().await
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use minh_phat_core::{Email, Language, Price};
    use serde_json::json;

    async fn store() -> SqliteStore {
        SqliteStore::in_memory().await.unwrap()
    }

    fn new_product(category: &str) -> NewProduct {
        serde_json::from_value(json!({
            "name": {"en": "Mango", "vi": "Xoài"},
            "description": {"en": "Cat Chu mango", "vi": "Xoài cát chu"},
            "price": 4.5,
            "originalPrice": 5.0,
            "category": category,
            "badge": {"en": "Sale", "vi": "Giảm giá"},
            "nutrition": {"calories": 60, "vitaminC": 36.4, "fiber": 1.6, "sugar": 13.7},
            "isOrganic": true
        }))
        .unwrap()
    }

    fn new_admin(username: &str) -> NewAdminUser {
        NewAdminUser {
            username: username.to_string(),
            password_hash: crate::services::auth::hash_password("admin123").unwrap(),
            full_name: Some("Administrator".to_string()),
            email: Some(Email::parse("admin@minhphat.com").unwrap()),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_product_persists_every_field() {
        let store = store().await;
        let created = store.create_product(new_product("tropical")).await.unwrap();
        let fetched = store.product(&created.id).await.unwrap().unwrap();

        assert_eq!(fetched.price, Price::from_cents(450));
        assert_eq!(fetched.original_price, Some(Price::from_cents(500)));
        assert_eq!(fetched.badge.as_ref().map(|b| b.vi.as_str()), Some("Giảm giá"));
        assert!((fetched.nutrition.unwrap().vitamin_c - 36.4).abs() < f64::EPSILON);
        assert!(fetched.organic);
        assert!(fetched.in_stock);
    }

    #[tokio::test]
    async fn test_patch_clears_nullable_fields() {
        let store = store().await;
        let created = store.create_product(new_product("tropical")).await.unwrap();
        let patch: ProductPatch =
            serde_json::from_value(json!({"originalPrice": null, "badge": null})).unwrap();

        let updated = store
            .update_product(&created.id, patch)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.original_price, None);
        assert_eq!(updated.badge, None);

        let fetched = store.product(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.original_price, None);
        assert!(fetched.updated_at > created.updated_at);
    }

    #[tokio::test]
    async fn test_filters_run_in_sql() {
        let store = store().await;
        store.create_product(new_product("tropical")).await.unwrap();
        let mut out_of_stock = new_product("citrus");
        out_of_stock.in_stock = false;
        store.create_product(out_of_stock).await.unwrap();

        let in_stock = store
            .list_products(&ProductFilter {
                in_stock_only: true,
                ..ProductFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(in_stock.len(), 1);
        assert_eq!(store.products_by_category("citrus").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_category_count_matches_id_or_slug() {
        let store = store().await;
        let category = store
            .create_category(
                serde_json::from_value(json!({
                    "id": "cat-1",
                    "name": {"en": "Tropical", "vi": "Nhiệt đới"},
                    "slug": "tropical"
                }))
                .unwrap(),
            )
            .await
            .unwrap();
        store.create_product(new_product("tropical")).await.unwrap();
        store.create_product(new_product("cat-1")).await.unwrap();
        store.create_product(new_product("citrus")).await.unwrap();

        let fetched = store.category(&category.id).await.unwrap().unwrap();
        assert_eq!(fetched.count, 2);
        let listed = store.list_categories(true).await.unwrap();
        assert_eq!(listed.first().map(|c| c.count), Some(2));
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_conflict() {
        let store = store().await;
        let input: NewCategory = serde_json::from_value(json!({
            "name": {"en": "Citrus", "vi": "Cam quýt"},
            "slug": "citrus"
        }))
        .unwrap();
        store.create_category(input.clone()).await.unwrap();
        let err = store.create_category(input).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_category_id_cannot_shadow_a_slug() {
        let store = store().await;
        let category = |id: Option<&str>, slug: &str| -> NewCategory {
            serde_json::from_value(json!({
                "id": id,
                "name": {"en": "Fruit", "vi": "Trái cây"},
                "slug": slug
            }))
            .unwrap()
        };

        let berries = store.create_category(category(None, "berries")).await.unwrap();
        let err = store
            .create_category(category(Some("berries"), "limes"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let err = store
            .create_category(category(None, berries.id.as_str()))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let citrus = store
            .create_category(category(Some("citrus"), "citrus"))
            .await
            .unwrap();
        let patch = CategoryPatch {
            slug: Some(berries.id.as_str().to_string()),
            ..CategoryPatch::default()
        };
        let err = store.update_category(&citrus.id, patch).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_content_unique_slot() {
        let store = store().await;
        let input: NewContent = serde_json::from_value(json!({
            "key": "hero_title",
            "value": {"en": "Fresh", "vi": "Tươi"},
            "section": "hero"
        }))
        .unwrap();
        store.create_content(input.clone()).await.unwrap();
        let err = store.create_content(input).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let found = store.content_by_key("hero_title", None).await.unwrap();
        assert_eq!(found.map(|c| c.section), Some("hero".to_string()));
    }

    #[tokio::test]
    async fn test_resubscribe_reactivates() {
        let store = store().await;
        let first = store
            .subscribe(NewSubscription::parse(Some("a@b.vn"), Some("vi"), Some("An")).unwrap())
            .await
            .unwrap();
        let second = store
            .subscribe(NewSubscription::parse(Some("A@B.vn"), None, None).unwrap())
            .await
            .unwrap();

        assert!(first.is_new());
        assert!(!second.is_new());
        assert_eq!(second.subscriber().language, Language::En);
        assert_eq!(second.subscriber().name.as_deref(), Some("An"));
        assert_eq!(store.list_subscribers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_subscriptions_share_one_row() {
        let store = store().await;
        for i in 0..20 {
            let email = format!("race{i}@example.vn");
            let subscription =
                || NewSubscription::parse(Some(email.as_str()), None, None).unwrap();
            let (a, b) = tokio::join!(
                store.subscribe(subscription()),
                store.subscribe(subscription())
            );
            let (a, b) = (a.unwrap(), b.unwrap());

            assert_ne!(a.is_new(), b.is_new());
            assert_eq!(a.subscriber().id, b.subscriber().id);
        }
        assert_eq!(store.list_subscribers().await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_sessions_expire_and_sweep() {
        let store = store().await;
        let user = store.create_admin_user(new_admin("admin")).await.unwrap();
        let live = store
            .create_session(&user.id, Utc::now() + TimeDelta::minutes(15))
            .await
            .unwrap();
        let stale = store
            .create_session(&user.id, Utc::now() - TimeDelta::seconds(1))
            .await
            .unwrap();
        store
            .create_session(&user.id, Utc::now() - TimeDelta::hours(1))
            .await
            .unwrap();

        assert!(store.session(stale.token.as_str()).await.unwrap().is_none());
        assert_eq!(store.sweep_expired_sessions().await.unwrap(), 1);
        let fetched = store.session(live.token.as_str()).await.unwrap().unwrap();
        assert_eq!(fetched.user_id, user.id);
        assert_eq!(
            fetched.expires_at.timestamp_millis(),
            live.expires_at.timestamp_millis()
        );
    }

    #[tokio::test]
    async fn test_session_for_unknown_user_is_not_found() {
        let store = store().await;
        let err = store
            .create_session(&AdminUserId::new("ghost"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_deleting_user_cascades_sessions() {
        let store = store().await;
        let user = store.create_admin_user(new_admin("admin")).await.unwrap();
        let session = store
            .create_session(&user.id, Utc::now() + TimeDelta::minutes(5))
            .await
            .unwrap();

        assert!(store.delete_admin_user(&user.id).await.unwrap());
        assert!(store.session(session.token.as_str()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_login() {
        let store = store().await;
        let user = store.create_admin_user(new_admin("admin")).await.unwrap();
        assert!(user.last_login.is_none());

        store.record_login(&user.id, Utc::now()).await.unwrap();
        let fetched = store.admin_user(&user.id).await.unwrap().unwrap();
        assert!(fetched.last_login.is_some());
        assert_eq!(fetched.email, user.email);
    }
}
