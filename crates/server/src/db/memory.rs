//! Process-memory store.
//!
//! All tables sit behind one `tokio::sync::RwLock`, so every operation sees a
//! consistent snapshot and writers never interleave. State is lost on restart;
//! the server reseeds it at startup.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::RwLock;

use minh_phat_core::{
    AdminSession, AdminUser, AdminUserId, Category, CategoryId, CategoryPatch, Content, ContentId,
    ContentPatch, NewAdminUser, NewCategory, NewContent, NewProduct, NewSubscription, Product,
    ProductId, ProductPatch, SessionId, Subscribed, Subscriber, SubscriberId, SubscriptionStatus,
    next_update_stamp,
};

use super::{
    ContentFilter, ProductFilter, RepositoryError, Store, attach_counts, count_products,
    id_conflict, new_session_token, slug_conflict,
};

#[derive(Debug, Default)]
struct Tables {
    products: HashMap<ProductId, Product>,
    categories: HashMap<CategoryId, Category>,
    content: HashMap<ContentId, Content>,
    subscribers: HashMap<SubscriberId, Subscriber>,
    admin_users: HashMap<AdminUserId, AdminUser>,
    /// Keyed by token.
    sessions: HashMap<String, AdminSession>,
}

impl Tables {
    fn products_snapshot(&self) -> Vec<Product> {
        self.products.values().cloned().collect()
    }

    /// Products reference categories by id or slug, so ids and slugs share
    /// one namespace across categories.
    fn category_identifier_taken(&self, value: &str, except: Option<&CategoryId>) -> bool {
        self.categories
            .values()
            .any(|c| (c.slug == value || c.id.as_str() == value) && Some(&c.id) != except)
    }

    fn content_slot_taken(&self, key: &str, section: &str, except: Option<&ContentId>) -> bool {
        self.content
            .values()
            .any(|c| c.occupies(key, section) && Some(&c.id) != except)
    }

    fn with_count(&self, mut category: Category) -> Category {
        category.count = count_products(&category, &self.products_snapshot());
        category
    }
}

/// In-memory [`Store`] implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored sessions, live or expired.
    #[cfg(test)]
    pub(crate) async fn session_count(&self) -> usize {
        self.tables.read().await.sessions.len()
    }
}

/// A timestamp-plus-random identifier in base 36.
fn mint_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
    let noise: u64 = rand::rng().random_range(0..36u64.pow(8));
    format!("{}{:0>8}", base36(millis), base36(noise))
}

fn base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        let digit = usize::try_from(n % 36).unwrap_or_default();
        out.push(char::from(DIGITS.get(digit).copied().unwrap_or(b'0')));
        n /= 36;
    }
    out.iter().rev().collect()
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, &str)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

fn sort_categories(categories: &mut [Category]) {
    categories.sort_by(|a, b| {
        a.sort_order
            .cmp(&b.sort_order)
            .then_with(|| a.name.en.cmp(&b.name.en))
            .then_with(|| a.id.cmp(&b.id))
    });
}

fn sort_content(content: &mut [Content]) {
    content.sort_by(|a, b| {
        a.section
            .cmp(&b.section)
            .then_with(|| a.sort_order.cmp(&b.sort_order))
            .then_with(|| a.key.cmp(&b.key))
    });
}

impl Store for MemoryStore {
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut products: Vec<Product> = tables
            .products
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        newest_first(&mut products, |p| (p.created_at, p.id.as_str()));
        Ok(products)
    }

    async fn product(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.tables.read().await.products.get(id).cloned())
    }

    async fn products_by_category(&self, category: &str) -> Result<Vec<Product>, RepositoryError> {
        let filter = ProductFilter {
            category: Some(category.to_owned()),
            ..ProductFilter::default()
        };
        self.list_products(&filter).await
    }

    async fn create_product(&self, input: NewProduct) -> Result<Product, RepositoryError> {
        let product = Product::from_input(ProductId::new(mint_id()), input, Utc::now());
        self.tables
            .write()
            .await
            .products
            .insert(product.id.clone(), product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: &ProductId,
        patch: ProductPatch,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut tables = self.tables.write().await;
        let Some(product) = tables.products.get_mut(id) else {
            return Ok(None);
        };
        patch.apply_to(product);
        product.updated_at = next_update_stamp(product.updated_at, Utc::now());
        Ok(Some(product.clone()))
    }

    async fn delete_product(&self, id: &ProductId) -> Result<bool, RepositoryError> {
        Ok(self.tables.write().await.products.remove(id).is_some())
    }

    async fn list_categories(&self, active_only: bool) -> Result<Vec<Category>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut categories: Vec<Category> = tables
            .categories
            .values()
            .filter(|c| !active_only || c.is_active)
            .cloned()
            .collect();
        attach_counts(&mut categories, &tables.products_snapshot());
        sort_categories(&mut categories);
        Ok(categories)
    }

    async fn category(&self, id: &CategoryId) -> Result<Option<Category>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .categories
            .get(id)
            .cloned()
            .map(|c| tables.with_count(c)))
    }

    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .categories
            .values()
            .find(|c| c.slug == slug)
            .cloned()
            .map(|c| tables.with_count(c)))
    }

    async fn create_category(&self, input: NewCategory) -> Result<Category, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.category_identifier_taken(&input.slug, None) {
            return Err(slug_conflict(&input.slug));
        }
        let id = input
            .id
            .clone()
            .unwrap_or_else(|| CategoryId::new(mint_id()));
        if tables.category_identifier_taken(id.as_str(), None) {
            return Err(id_conflict(&id));
        }
        let category = Category::from_input(id, input, Utc::now());
        tables
            .categories
            .insert(category.id.clone(), category.clone());
        Ok(tables.with_count(category))
    }

    async fn update_category(
        &self,
        id: &CategoryId,
        patch: CategoryPatch,
    ) -> Result<Option<Category>, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.categories.contains_key(id) {
            return Ok(None);
        }
        if let Some(slug) = patch.slug.as_deref()
            && tables.category_identifier_taken(slug, Some(id))
        {
            return Err(slug_conflict(slug));
        }
        let Some(category) = tables.categories.get_mut(id) else {
            return Ok(None);
        };
        patch.apply_to(category);
        category.updated_at = next_update_stamp(category.updated_at, Utc::now());
        let updated = category.clone();
        Ok(Some(tables.with_count(updated)))
    }

    async fn delete_category(&self, id: &CategoryId) -> Result<bool, RepositoryError> {
        Ok(self.tables.write().await.categories.remove(id).is_some())
    }

    async fn list_content(&self, filter: &ContentFilter) -> Result<Vec<Content>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut content: Vec<Content> = tables
            .content
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        sort_content(&mut content);
        Ok(content)
    }

    async fn content(&self, id: &ContentId) -> Result<Option<Content>, RepositoryError> {
        Ok(self.tables.read().await.content.get(id).cloned())
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
        Ok(self.list_content(&filter).await?.into_iter().next())
    }

    async fn content_by_section(&self, section: &str) -> Result<Vec<Content>, RepositoryError> {
        let filter = ContentFilter {
            section: Some(section.to_owned()),
            key: None,
        };
        self.list_content(&filter).await
    }

    async fn create_content(&self, input: NewContent) -> Result<Content, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.content_slot_taken(&input.key, &input.section, None) {
            return Err(RepositoryError::Conflict(format!(
                "Content with key '{}' already exists in section '{}'",
                input.key, input.section
            )));
        }
        let content = Content::from_input(ContentId::new(mint_id()), input, Utc::now());
        tables.content.insert(content.id.clone(), content.clone());
        Ok(content)
    }

    async fn update_content(
        &self,
        id: &ContentId,
        patch: ContentPatch,
    ) -> Result<Option<Content>, RepositoryError> {
        let mut tables = self.tables.write().await;
        let Some(current) = tables.content.get(id) else {
            return Ok(None);
        };
        let (key, section) = patch.target_slot(current);
        if tables.content_slot_taken(key, section, Some(id)) {
            return Err(RepositoryError::Conflict(format!(
                "Content with key '{key}' already exists in section '{section}'"
            )));
        }
        let Some(content) = tables.content.get_mut(id) else {
            return Ok(None);
        };
        patch.apply_to(content);
        content.updated_at = next_update_stamp(content.updated_at, Utc::now());
        Ok(Some(content.clone()))
    }

    async fn delete_content(&self, id: &ContentId) -> Result<bool, RepositoryError> {
        Ok(self.tables.write().await.content.remove(id).is_some())
    }

    async fn subscribe(&self, input: NewSubscription) -> Result<Subscribed, RepositoryError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        if let Some(existing) = tables
            .subscribers
            .values_mut()
            .find(|s| s.email == input.email)
        {
            input.refresh(existing);
            existing.updated_at = next_update_stamp(existing.updated_at, now);
            return Ok(Subscribed::Updated(existing.clone()));
        }
        let subscriber = Subscriber {
            id: SubscriberId::new(mint_id()),
            email: input.email,
            name: input.name,
            language: input.language,
            status: SubscriptionStatus::Active,
            created_at: now,
            updated_at: now,
        };
        tables
            .subscribers
            .insert(subscriber.id.clone(), subscriber.clone());
        Ok(Subscribed::Created(subscriber))
    }

    async fn list_subscribers(&self) -> Result<Vec<Subscriber>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut subscribers: Vec<Subscriber> = tables.subscribers.values().cloned().collect();
        newest_first(&mut subscribers, |s| (s.created_at, s.id.as_str()));
        Ok(subscribers)
    }

    async fn create_admin_user(&self, input: NewAdminUser) -> Result<AdminUser, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables
            .admin_users
            .values()
            .any(|u| u.username == input.username)
        {
            return Err(RepositoryError::Conflict(format!(
                "Admin user '{}' already exists",
                input.username
            )));
        }
        let user = AdminUser::from_input(AdminUserId::new(mint_id()), input, Utc::now());
        tables.admin_users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn admin_user(&self, id: &AdminUserId) -> Result<Option<AdminUser>, RepositoryError> {
        Ok(self.tables.read().await.admin_users.get(id).cloned())
    }

    async fn admin_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AdminUser>, RepositoryError> {
        Ok(self
            .tables
            .read()
            .await
            .admin_users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list_admin_users(&self) -> Result<Vec<AdminUser>, RepositoryError> {
        let mut users: Vec<AdminUser> = self
            .tables
            .read()
            .await
            .admin_users
            .values()
            .cloned()
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn record_login(&self, id: &AdminUserId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let user = tables
            .admin_users
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        user.last_login = Some(at);
        user.updated_at = next_update_stamp(user.updated_at, at);
        Ok(())
    }

    async fn delete_admin_user(&self, id: &AdminUserId) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        let removed = tables.admin_users.remove(id).is_some();
        if removed {
            tables.sessions.retain(|_, s| &s.user_id != id);
        }
        Ok(removed)
    }

    async fn create_session(
        &self,
        user_id: &AdminUserId,
        expires_at: DateTime<Utc>,
    ) -> Result<AdminSession, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.admin_users.contains_key(user_id) {
            return Err(RepositoryError::NotFound);
        }
        let session = AdminSession {
            id: SessionId::new(mint_id()),
            token: new_session_token(),
            user_id: user_id.clone(),
            expires_at,
            created_at: Utc::now(),
        };
        tables
            .sessions
            .insert(session.token.as_str().to_owned(), session.clone());
        Ok(session)
    }

    async fn session(&self, token: &str) -> Result<Option<AdminSession>, RepositoryError> {
        let now = Utc::now();
        {
            let tables = self.tables.read().await;
            match tables.sessions.get(token) {
                None => return Ok(None),
                Some(session) if !session.is_expired(now) => return Ok(Some(session.clone())),
                Some(_) => {}
            }
        }
        let mut tables = self.tables.write().await;
        if tables.sessions.get(token).is_some_and(|s| s.is_expired(now)) {
            tables.sessions.remove(token);
        }
        Ok(None)
    }

    async fn delete_session(&self, token: &str) -> Result<bool, RepositoryError> {
        Ok(self.tables.write().await.sessions.remove(token).is_some())
    }

    async fn sweep_expired_sessions(&self) -> Result<u64, RepositoryError> {
        let now = Utc::now();
        let mut tables = self.tables.write().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, s| !s.is_expired(now));
        Ok(u64::try_from(before - tables.sessions.len()).unwrap_or(u64::MAX))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
