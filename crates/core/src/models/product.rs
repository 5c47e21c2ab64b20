//! Catalog products.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{default_true, double_option};
use crate::types::{Bilingual, Price, ProductId};
use crate::validation::ValidationError;

/// Per-serving nutrition facts shown on the product page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Nutrition {
    #[serde(default)]
    pub calories: f64,
    #[serde(default, alias = "vitamin_c")]
    pub vitamin_c: f64,
    #[serde(default)]
    pub fiber: f64,
    #[serde(default)]
    pub sugar: f64,
}

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: Bilingual,
    pub description: Bilingual,
    pub price: Price,
    pub original_price: Option<Price>,
    pub image: String,
    /// Id or slug of the owning category.
    pub category: String,
    pub unit: Option<String>,
    pub origin: Option<String>,
    pub badge: Option<Bilingual>,
    pub badge_color: Option<String>,
    pub in_stock: bool,
    pub rating: f64,
    pub reviews_count: u32,
    pub nutrition: Option<Nutrition>,
    #[serde(rename = "isOrganic")]
    pub organic: bool,
    #[serde(rename = "isSeasonal")]
    pub seasonal: bool,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Build a product from a validated input.
    #[must_use]
    pub fn from_input(id: ProductId, input: NewProduct, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: input.name,
            description: input.description,
            price: input.price,
            original_price: input.original_price,
            image: input.image,
            category: input.category,
            unit: input.unit,
            origin: input.origin,
            badge: input.badge,
            badge_color: input.badge_color,
            in_stock: input.in_stock,
            rating: input.rating,
            reviews_count: input.reviews_count,
            nutrition: input.nutrition,
            organic: input.organic,
            seasonal: input.seasonal,
            featured: input.featured,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the product belongs to the category known by `id` or `slug`.
    #[must_use]
    pub fn belongs_to(&self, id: &str, slug: &str) -> bool {
        self.category == id || self.category == slug
    }

    /// Case-insensitive match of `needle` (already lowercased) against the
    /// name and description in both languages.
    #[must_use]
    pub fn matches_search(&self, needle: &str) -> bool {
        self.name.contains_lowercase(needle) || self.description.contains_lowercase(needle)
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    #[serde(default)]
    pub name: Bilingual,
    #[serde(default)]
    pub description: Bilingual,
    #[serde(default)]
    pub price: Price,
    #[serde(default)]
    pub original_price: Option<Price>,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub badge: Option<Bilingual>,
    #[serde(default)]
    pub badge_color: Option<String>,
    #[serde(default = "default_true")]
    pub in_stock: bool,
    #[serde(default)]
    pub rating: f64,
    #[serde(default, alias = "reviews")]
    pub reviews_count: u32,
    #[serde(default, alias = "nutritionalInfo")]
    pub nutrition: Option<Nutrition>,
    #[serde(default, rename = "isOrganic", alias = "organic")]
    pub organic: bool,
    #[serde(default, rename = "isSeasonal", alias = "seasonal")]
    pub seasonal: bool,
    #[serde(default)]
    pub featured: bool,
}

impl NewProduct {
    /// Check the fields every product must carry.
    ///
    /// Category existence is a store lookup and is checked by the caller.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.name.is_complete() {
            return Err(ValidationError::IncompleteTranslation("Product name"));
        }
        if !self.price.is_positive() {
            return Err(ValidationError::NonPositivePrice);
        }
        if self.original_price.is_some_and(|p| !p.is_positive()) {
            return Err(ValidationError::NonPositiveOriginalPrice);
        }
        if self.category.trim().is_empty() {
            return Err(ValidationError::Required("Category"));
        }
        validate_rating(self.rating)
    }
}

/// Partial update for a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    #[serde(default)]
    pub name: Option<Bilingual>,
    #[serde(default)]
    pub description: Option<Bilingual>,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default, deserialize_with = "double_option")]
    pub original_price: Option<Option<Price>>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub unit: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub origin: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub badge: Option<Option<Bilingual>>,
    #[serde(default, deserialize_with = "double_option")]
    pub badge_color: Option<Option<String>>,
    #[serde(default)]
    pub in_stock: Option<bool>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default, alias = "reviews")]
    pub reviews_count: Option<u32>,
    #[serde(default, alias = "nutritionalInfo", deserialize_with = "double_option")]
    pub nutrition: Option<Option<Nutrition>>,
    #[serde(default, rename = "isOrganic", alias = "organic")]
    pub organic: Option<bool>,
    #[serde(default, rename = "isSeasonal", alias = "seasonal")]
    pub seasonal: Option<bool>,
    #[serde(default)]
    pub featured: Option<bool>,
}

impl ProductPatch {
    /// Check the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.as_ref().is_some_and(|n| !n.is_complete()) {
            return Err(ValidationError::IncompleteTranslation("Product name"));
        }
        if self.price.is_some_and(|p| !p.is_positive()) {
            return Err(ValidationError::NonPositivePrice);
        }
        if let Some(Some(original)) = self.original_price
            && !original.is_positive()
        {
            return Err(ValidationError::NonPositiveOriginalPrice);
        }
        if self.category.as_ref().is_some_and(|c| c.trim().is_empty()) {
            return Err(ValidationError::Required("Category"));
        }
        self.rating.map_or(Ok(()), validate_rating)
    }

    /// Merge the present fields into `product`. Timestamps are the caller's job.
    pub fn apply_to(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(original_price) = self.original_price {
            product.original_price = original_price;
        }
        if let Some(image) = self.image {
            product.image = image;
        }
        if let Some(category) = self.category {
            product.category = category;
        }
        if let Some(unit) = self.unit {
            product.unit = unit;
        }
        if let Some(origin) = self.origin {
            product.origin = origin;
        }
        if let Some(badge) = self.badge {
            product.badge = badge;
        }
        if let Some(badge_color) = self.badge_color {
            product.badge_color = badge_color;
        }
        if let Some(in_stock) = self.in_stock {
            product.in_stock = in_stock;
        }
        if let Some(rating) = self.rating {
            product.rating = rating;
        }
        if let Some(reviews_count) = self.reviews_count {
            product.reviews_count = reviews_count;
        }
        if let Some(nutrition) = self.nutrition {
            product.nutrition = nutrition;
        }
        if let Some(organic) = self.organic {
            product.organic = organic;
        }
        if let Some(seasonal) = self.seasonal {
            product.seasonal = seasonal;
        }
        if let Some(featured) = self.featured {
            product.featured = featured;
        }
    }
}

fn validate_rating(rating: f64) -> Result<(), ValidationError> {
    if (0.0..=5.0).contains(&rating) {
        Ok(())
    } else {
        Err(ValidationError::RatingOutOfRange)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strawberries() -> NewProduct {
        serde_json::from_value(json!({
            "name": {"en": "Organic Strawberries", "vi": "Dâu tây hữu cơ"},
            "price": 4.99,
            "category": "berries",
            "organic": true
        }))
        .unwrap()
    }

    #[test]
    fn test_new_product_defaults() {
        let input = strawberries();
        assert!(input.in_stock);
        assert!(input.organic);
        assert!(!input.seasonal);
        assert_eq!(input.reviews_count, 0);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_translation() {
        let mut input = strawberries();
        input.name.vi = String::new();
        assert_eq!(
            input.validate(),
            Err(ValidationError::IncompleteTranslation("Product name"))
        );
    }

    #[test]
    fn test_validate_rejects_non_positive_price() {
        let mut input = strawberries();
        input.price = Price::from_cents(0);
        assert_eq!(input.validate(), Err(ValidationError::NonPositivePrice));
    }

    #[test]
    fn test_validate_rejects_blank_category() {
        let mut input = strawberries();
        input.category = "  ".to_string();
        assert_eq!(input.validate(), Err(ValidationError::Required("Category")));
    }

    #[test]
    fn test_serialized_flags_use_is_prefix() {
        let product = Product::from_input(ProductId::new("p1"), strawberries(), Utc::now());
        let value = serde_json::to_value(&product).unwrap();
        assert_eq!(value["isOrganic"], json!(true));
        assert_eq!(value["isSeasonal"], json!(false));
        assert_eq!(value["inStock"], json!(true));
        assert_eq!(value["price"], json!(4.99));
        assert!(value.get("organic").is_none());
    }

    #[test]
    fn test_patch_leaves_absent_fields_untouched() {
        let mut product = Product::from_input(ProductId::new("p1"), strawberries(), Utc::now());
        let before = product.clone();

        let patch: ProductPatch = serde_json::from_value(json!({"price": 5.49})).unwrap();
        patch.apply_to(&mut product);

        assert_eq!(product.price, "5.49".parse().unwrap());
        assert_eq!(product.name, before.name);
        assert_eq!(product.category, before.category);
        assert_eq!(product.organic, before.organic);
        assert_eq!(product.original_price, before.original_price);
    }

    #[test]
    fn test_patch_null_clears_nullable_field() {
        let mut input = strawberries();
        input.original_price = Some(Price::from_cents(699));
        let mut product = Product::from_input(ProductId::new("p1"), input, Utc::now());

        let keep: ProductPatch = serde_json::from_value(json!({})).unwrap();
        assert_eq!(keep.original_price, None);
        keep.apply_to(&mut product);
        assert!(product.original_price.is_some());

        let clear: ProductPatch =
            serde_json::from_value(json!({"originalPrice": null})).unwrap();
        assert_eq!(clear.original_price, Some(None));
        clear.apply_to(&mut product);
        assert!(product.original_price.is_none());
    }

    #[test]
    fn test_patch_validate_checks_present_fields_only() {
        assert!(ProductPatch::default().validate().is_ok());

        let patch = ProductPatch {
            price: Some(Price::from_cents(-1)),
            ..ProductPatch::default()
        };
        assert_eq!(patch.validate(), Err(ValidationError::NonPositivePrice));

        let patch = ProductPatch {
            rating: Some(7.5),
            ..ProductPatch::default()
        };
        assert_eq!(patch.validate(), Err(ValidationError::RatingOutOfRange));
    }

    #[test]
    fn test_matches_search_across_languages() {
        let product = Product::from_input(ProductId::new("p1"), strawberries(), Utc::now());
        assert!(product.matches_search("strawberr"));
        assert!(product.matches_search("dâu"));
        assert!(!product.matches_search("mango"));
    }

    #[test]
    fn test_belongs_to_by_id_or_slug() {
        let product = Product::from_input(ProductId::new("p1"), strawberries(), Utc::now());
        assert!(product.belongs_to("cat-123", "berries"));
        assert!(product.belongs_to("berries", "other"));
        assert!(!product.belongs_to("citrus", "citrus"));
    }
}
