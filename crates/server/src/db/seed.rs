//! Starter data for an empty store.
//!
//! Seeds the default admin account, four fruit categories, eight products and
//! the storefront copy. Both halves are idempotent: the admin is only created
//! when the username is free, and the catalog only when no category exists.

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use minh_phat_core::{
    Bilingual, ContentType, Email, EmailError, NewAdminUser, NewCategory, NewContent, NewProduct,
    Nutrition, Price,
};

use super::{RepositoryError, Store};
use crate::services::AuthError;
use crate::services::auth::hash_password;

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
const DEFAULT_ADMIN_NAME: &str = "Administrator";
const DEFAULT_ADMIN_EMAIL: &str = "admin@minhphat.com";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("failed to hash admin password: {0}")]
    Auth(#[from] AuthError),

    #[error("invalid admin email: {0}")]
    Email(#[from] EmailError),
}

/// What a seeding run actually wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedOutcome {
    pub admin_created: bool,
    pub catalog_seeded: bool,
}

/// Seed `store` with the default admin and starter catalog where missing.
///
/// # Errors
///
/// Returns `SeedError` if hashing or any store write fails.
pub async fn seed<S: Store>(
    store: &S,
    admin_password: &SecretString,
) -> Result<SeedOutcome, SeedError> {
    let admin_created = seed_admin(store, admin_password).await?;
    let catalog_seeded = seed_catalog(store).await?;

    tracing::info!(admin_created, catalog_seeded, "Seeding finished");
    Ok(SeedOutcome {
        admin_created,
        catalog_seeded,
    })
}

async fn seed_admin<S: Store>(store: &S, password: &SecretString) -> Result<bool, SeedError> {
    if store
        .admin_user_by_username(DEFAULT_ADMIN_USERNAME)
        .await?
        .is_some()
    {
        return Ok(false);
    }

    store
        .create_admin_user(NewAdminUser {
            username: DEFAULT_ADMIN_USERNAME.to_string(),
            password_hash: hash_password(password.expose_secret())?,
            full_name: Some(DEFAULT_ADMIN_NAME.to_string()),
            email: Some(Email::parse(DEFAULT_ADMIN_EMAIL)?),
            is_active: true,
        })
        .await?;
    tracing::info!(username = DEFAULT_ADMIN_USERNAME, "Seeded default admin user");
    Ok(true)
}

async fn seed_catalog<S: Store>(store: &S) -> Result<bool, SeedError> {
    if !store.list_categories(false).await?.is_empty() {
        tracing::debug!("Catalog already present, skipping");
        return Ok(false);
    }

    for category in categories() {
        store.create_category(category).await?;
    }
    for product in products() {
        store.create_product(product).await?;
    }
    for entry in content() {
        store.create_content(entry).await?;
    }
    Ok(true)
}

fn category(
    slug: &str,
    name: (&str, &str),
    description: (&str, &str),
    emoji: &str,
    color: &str,
    sort_order: i32,
) -> NewCategory {
    NewCategory {
        id: None,
        name: Bilingual::new(name.0, name.1),
        description: Bilingual::new(description.0, description.1),
        slug: slug.to_string(),
        emoji: Some(emoji.to_string()),
        image: None,
        color: Some(color.to_string()),
        parent_id: None,
        sort_order,
        is_active: true,
    }
}

fn categories() -> Vec<NewCategory> {
    vec![
        category(
            "tropical",
            ("Tropical Fruits", "Trái cây nhiệt đới"),
            (
                "Fresh tropical fruits from exotic locations",
                "Trái cây nhiệt đới tươi từ những vùng đất xa xôi",
            ),
            "🥭",
            "bg-fresh-orange/10",
            1,
        ),
        category(
            "berries",
            ("Berries", "Quả mọng"),
            (
                "Antioxidant-rich berries for your health",
                "Quả mọng giàu chất chống oxy hóa cho sức khỏe",
            ),
            "🫐",
            "bg-fresh-purple/10",
            2,
        ),
        category(
            "citrus",
            ("Citrus", "Trái cây họ cam chanh"),
            (
                "Vitamin C packed citrus fruits",
                "Trái cây họ cam chanh giàu vitamin C",
            ),
            "🍋",
            "bg-fresh-yellow/10",
            3,
        ),
        category(
            "stone-fruits",
            ("Stone Fruits", "Trái cây có hạt cứng"),
            (
                "Juicy stone fruits perfect for summer",
                "Trái cây có hạt cứng ngon ngọt, hoàn hảo cho mùa hè",
            ),
            "🍑",
            "bg-fresh-red/10",
            4,
        ),
    ]
}

/// One starter product. Prices are in cents.
struct Starter {
    name: (&'static str, &'static str),
    description: (&'static str, &'static str),
    price: i64,
    original_price: Option<i64>,
    image: &'static str,
    category: &'static str,
    badge: (&'static str, &'static str),
    badge_color: &'static str,
    origin: &'static str,
    rating: f64,
    reviews: u32,
    nutrition: [f64; 4],
    organic: bool,
    seasonal: bool,
    featured: bool,
    in_stock: bool,
}

impl From<Starter> for NewProduct {
    fn from(s: Starter) -> Self {
        let [calories, vitamin_c, fiber, sugar] = s.nutrition;
        Self {
            name: Bilingual::new(s.name.0, s.name.1),
            description: Bilingual::new(s.description.0, s.description.1),
            price: Price::from_cents(s.price),
            original_price: s.original_price.map(Price::from_cents),
            image: s.image.to_string(),
            category: s.category.to_string(),
            unit: Some("lb".to_string()),
            origin: Some(s.origin.to_string()),
            badge: Some(Bilingual::new(s.badge.0, s.badge.1)),
            badge_color: Some(s.badge_color.to_string()),
            in_stock: s.in_stock,
            rating: s.rating,
            reviews_count: s.reviews,
            nutrition: Some(Nutrition {
                calories,
                vitamin_c,
                fiber,
                sugar,
            }),
            organic: s.organic,
            seasonal: s.seasonal,
            featured: s.featured,
        }
    }
}

#[allow(clippy::too_many_lines)]
fn products() -> Vec<NewProduct> {
    let starters = [
        Starter {
            name: ("Organic Strawberries", "Dâu tây hữu cơ"),
            description: (
                "Fresh organic strawberries, perfect for desserts",
                "Dâu tây hữu cơ tươi, hoàn hảo cho món tráng miệng",
            ),
            price: 499,
            original_price: Some(699),
            image: "🍓",
            category: "berries",
            badge: ("Organic", "Hữu cơ"),
            badge_color: "bg-fresh-green",
            origin: "California, USA",
            rating: 4.8,
            reviews: 127,
            nutrition: [32.0, 89.0, 2.0, 4.9],
            organic: true,
            seasonal: true,
            featured: true,
            in_stock: true,
        },
        Starter {
            name: ("Fresh Bananas", "Chuối tươi"),
            description: (
                "Sweet and creamy bananas, great for smoothies",
                "Chuối ngọt và mềm, tuyệt vời cho sinh tố",
            ),
            price: 249,
            original_price: None,
            image: "🍌",
            category: "tropical",
            badge: ("Popular", "Phổ biến"),
            badge_color: "bg-fresh-yellow",
            origin: "Ecuador",
            rating: 4.6,
            reviews: 89,
            nutrition: [89.0, 10.0, 2.6, 12.0],
            organic: false,
            seasonal: false,
            featured: false,
            in_stock: true,
        },
        Starter {
            name: ("Fresh Oranges", "Cam tươi"),
            description: (
                "Juicy oranges packed with vitamin C",
                "Cam ngon ngọt giàu vitamin C",
            ),
            price: 349,
            original_price: None,
            image: "🍊",
            category: "citrus",
            badge: ("Vitamin C", "Vitamin C"),
            badge_color: "bg-fresh-orange",
            origin: "Florida, USA",
            rating: 4.7,
            reviews: 156,
            nutrition: [47.0, 92.0, 2.4, 9.0],
            organic: false,
            seasonal: false,
            featured: true,
            in_stock: true,
        },
        Starter {
            name: ("Cat Chu Mangoes", "Xoài cát Chu"),
            description: (
                "Fragrant, honey-sweet mangoes from the Mekong Delta",
                "Xoài thơm ngọt như mật từ đồng bằng sông Cửu Long",
            ),
            price: 599,
            original_price: Some(749),
            image: "🥭",
            category: "tropical",
            badge: ("Organic", "Hữu cơ"),
            badge_color: "bg-fresh-green",
            origin: "Đồng Tháp, Việt Nam",
            rating: 4.9,
            reviews: 212,
            nutrition: [60.0, 36.0, 1.6, 14.0],
            organic: true,
            seasonal: true,
            featured: true,
            in_stock: true,
        },
        Starter {
            name: ("Wild Blueberries", "Việt quất rừng"),
            description: (
                "Small, intensely flavored blueberries",
                "Việt quất nhỏ với hương vị đậm đà",
            ),
            price: 549,
            original_price: None,
            image: "🫐",
            category: "berries",
            badge: ("Organic", "Hữu cơ"),
            badge_color: "bg-fresh-green",
            origin: "Maine, USA",
            rating: 4.7,
            reviews: 98,
            nutrition: [57.0, 9.7, 2.4, 10.0],
            organic: true,
            seasonal: false,
            featured: false,
            in_stock: true,
        },
        Starter {
            name: ("Red Dragon Fruit", "Thanh long ruột đỏ"),
            description: (
                "Vibrant red-fleshed dragon fruit, mildly sweet",
                "Thanh long ruột đỏ rực rỡ, ngọt dịu",
            ),
            price: 449,
            original_price: None,
            image: "🐉",
            category: "tropical",
            badge: ("Local", "Đặc sản"),
            badge_color: "bg-fresh-red",
            origin: "Bình Thuận, Việt Nam",
            rating: 4.5,
            reviews: 64,
            nutrition: [60.0, 3.0, 3.0, 8.0],
            organic: true,
            seasonal: false,
            featured: false,
            in_stock: true,
        },
        Starter {
            name: ("Seedless Lemons", "Chanh không hạt"),
            description: (
                "Bright, tangy lemons for drinks and cooking",
                "Chanh tươi chua thanh cho đồ uống và nấu ăn",
            ),
            price: 199,
            original_price: None,
            image: "🍋",
            category: "citrus",
            badge: ("Fresh", "Tươi"),
            badge_color: "bg-fresh-yellow",
            origin: "Long An, Việt Nam",
            rating: 4.4,
            reviews: 45,
            nutrition: [29.0, 53.0, 2.8, 2.5],
            organic: false,
            seasonal: false,
            featured: false,
            in_stock: true,
        },
        Starter {
            name: ("White Peaches", "Đào trắng"),
            description: (
                "Delicate white peaches, soft and fragrant",
                "Đào trắng mềm mại, thơm dịu",
            ),
            price: 699,
            original_price: None,
            image: "🍑",
            category: "stone-fruits",
            badge: ("Seasonal", "Theo mùa"),
            badge_color: "bg-fresh-orange",
            origin: "Sa Pa, Việt Nam",
            rating: 4.6,
            reviews: 37,
            nutrition: [39.0, 6.6, 1.5, 8.4],
            organic: false,
            seasonal: true,
            featured: false,
            in_stock: false,
        },
    ];
    starters.into_iter().map(NewProduct::from).collect()
}

fn text(key: &str, section: &str, en: &str, vi: &str, sort_order: i32) -> NewContent {
    NewContent {
        key: key.to_string(),
        value: Bilingual::new(en, vi),
        content_type: ContentType::Text,
        section: section.to_string(),
        sort_order,
    }
}

fn content() -> Vec<NewContent> {
    vec![
        text(
            "hero_title",
            "hero",
            "Fresh Fruits Delivered Daily",
            "Trái cây tươi giao hàng hàng ngày",
            1,
        ),
        text(
            "hero_subtitle",
            "hero",
            "Farm-fresh fruits delivered to your doorstep. Support local farmers while \
             enjoying the finest quality produce at unbeatable prices.",
            "Trái cây tươi từ trang trại giao đến tận nhà. Hỗ trợ nông dân địa phương \
             đồng thời thưởng thức sản phẩm chất lượng cao nhất với giá cả tốt nhất.",
            2,
        ),
        text(
            "features_title",
            "features",
            "Why Choose Minh Phát?",
            "Tại sao chọn Minh Phát?",
            1,
        ),
        text(
            "newsletter_title",
            "newsletter",
            "Stay Fresh with Our Newsletter",
            "Luôn cập nhật với Bản tin của chúng tôi",
            1,
        ),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::{ContentFilter, MemoryStore, ProductFilter};

    fn password() -> SecretString {
        SecretString::from("admin123")
    }

    #[test]
    fn test_starter_data_is_valid() {
        for category in categories() {
            assert!(category.validate().is_ok(), "{}", category.slug);
        }
        let slugs: Vec<_> = categories().into_iter().map(|c| c.slug).collect();
        for product in products() {
            assert!(product.validate().is_ok(), "{}", product.name.en);
            assert!(slugs.contains(&product.category));
        }
        for entry in content() {
            assert!(entry.validate().is_ok(), "{}", entry.key);
        }
    }

    #[tokio::test]
    async fn test_seed_populates_empty_store() {
        let store = MemoryStore::new();
        let outcome = seed(&store, &password()).await.unwrap();
        assert!(outcome.admin_created);
        assert!(outcome.catalog_seeded);

        let categories = store.list_categories(false).await.unwrap();
        assert_eq!(categories.len(), 4);
        assert!(categories.iter().all(|c| c.count > 0));
        assert_eq!(
            store
                .list_products(&ProductFilter::default())
                .await
                .unwrap()
                .len(),
            8
        );
        assert_eq!(
            store
                .list_content(&ContentFilter::default())
                .await
                .unwrap()
                .len(),
            4
        );
        assert!(
            store
                .verify_password(DEFAULT_ADMIN_USERNAME, "admin123")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let store = MemoryStore::new();
        seed(&store, &password()).await.unwrap();
        let again = seed(&store, &password()).await.unwrap();
        assert_eq!(again, SeedOutcome::default());
        assert_eq!(store.list_categories(false).await.unwrap().len(), 4);
        assert_eq!(store.list_admin_users().await.unwrap().len(), 1);
    }
}
