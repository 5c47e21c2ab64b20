//! Product categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{default_true, double_option};
use crate::types::{Bilingual, CategoryId};
use crate::validation::{ValidationError, is_valid_slug};

/// A product category.
///
/// `count` is never stored: stores fill it in on every read from the products
/// that reference the category by id or slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: Bilingual,
    pub description: Bilingual,
    pub slug: String,
    pub emoji: Option<String>,
    pub image: Option<String>,
    pub color: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub count: u32,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// Build a category from a validated input. The count starts at zero.
    #[must_use]
    pub fn from_input(id: CategoryId, input: NewCategory, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: input.name,
            description: input.description,
            slug: input.slug,
            emoji: input.emoji,
            image: input.image,
            color: input.color,
            parent_id: input.parent_id,
            count: 0,
            sort_order: input.sort_order,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    /// Caller-chosen identifier. The store mints one when absent.
    #[serde(default)]
    pub id: Option<CategoryId>,
    #[serde(default)]
    pub name: Bilingual,
    #[serde(default)]
    pub description: Bilingual,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl NewCategory {
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.name.is_complete() {
            return Err(ValidationError::IncompleteTranslation("Category name"));
        }
        if self.slug.is_empty() {
            return Err(ValidationError::Required("Slug"));
        }
        if !is_valid_slug(&self.slug) {
            return Err(ValidationError::InvalidSlug);
        }
        if self.id.as_ref().is_some_and(|id| id.as_str().trim().is_empty()) {
            return Err(ValidationError::Required("Category id"));
        }
        Ok(())
    }
}

/// Partial update for a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPatch {
    #[serde(default)]
    pub name: Option<Bilingual>,
    #[serde(default)]
    pub description: Option<Bilingual>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub emoji: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub image: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub color: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<CategoryId>>,
    #[serde(default)]
    pub sort_order: Option<i32>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl CategoryPatch {
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.as_ref().is_some_and(|n| !n.is_complete()) {
            return Err(ValidationError::IncompleteTranslation("Category name"));
        }
        if self.slug.as_deref().is_some_and(|s| !is_valid_slug(s)) {
            return Err(ValidationError::InvalidSlug);
        }
        Ok(())
    }

    pub fn apply_to(self, category: &mut Category) {
        if let Some(name) = self.name {
            category.name = name;
        }
        if let Some(description) = self.description {
            category.description = description;
        }
        if let Some(slug) = self.slug {
            category.slug = slug;
        }
        if let Some(emoji) = self.emoji {
            category.emoji = emoji;
        }
        if let Some(image) = self.image {
            category.image = image;
        }
        if let Some(color) = self.color {
            category.color = color;
        }
        if let Some(parent_id) = self.parent_id {
            category.parent_id = parent_id;
        }
        if let Some(sort_order) = self.sort_order {
            category.sort_order = sort_order;
        }
        if let Some(is_active) = self.is_active {
            category.is_active = is_active;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_category_defaults_to_active() {
        let input: NewCategory = serde_json::from_value(json!({
            "name": {"en": "Citrus", "vi": "Cam quýt"},
            "slug": "citrus"
        }))
        .unwrap();
        assert!(input.is_active);
        assert_eq!(input.sort_order, 0);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_slug() {
        let input: NewCategory = serde_json::from_value(json!({
            "name": {"en": "Citrus", "vi": "Cam quýt"}
        }))
        .unwrap();
        assert_eq!(input.validate(), Err(ValidationError::Required("Slug")));
    }

    #[test]
    fn test_validate_rejects_malformed_slug() {
        let input: NewCategory = serde_json::from_value(json!({
            "name": {"en": "Citrus", "vi": "Cam quýt"},
            "slug": "Citrus Fruits"
        }))
        .unwrap();
        assert_eq!(input.validate(), Err(ValidationError::InvalidSlug));
    }

    #[test]
    fn test_patch_clears_parent() {
        let input: NewCategory = serde_json::from_value(json!({
            "name": {"en": "Lemons", "vi": "Chanh"},
            "slug": "lemons",
            "parentId": "citrus"
        }))
        .unwrap();
        let mut category = Category::from_input(CategoryId::new("c1"), input, Utc::now());

        let patch: CategoryPatch = serde_json::from_value(json!({"parentId": null})).unwrap();
        patch.apply_to(&mut category);

        assert_eq!(category.parent_id, None);
        assert_eq!(category.slug, "lemons");
    }
}
