//! Editable page content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Bilingual, ContentId, ContentType};
use crate::validation::ValidationError;

/// A piece of page copy, addressed by `(section, key)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub id: ContentId,
    pub key: String,
    pub value: Bilingual,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub section: String,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Content {
    #[must_use]
    pub fn from_input(id: ContentId, input: NewContent, now: DateTime<Utc>) -> Self {
        Self {
            id,
            key: input.key,
            value: input.value,
            content_type: input.content_type,
            section: input.section,
            sort_order: input.sort_order,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this entry occupies the `(key, section)` slot.
    #[must_use]
    pub fn occupies(&self, key: &str, section: &str) -> bool {
        self.key == key && self.section == section
    }
}

/// Input for creating content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContent {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: Bilingual,
    #[serde(default, rename = "type")]
    pub content_type: ContentType,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub sort_order: i32,
}

impl NewContent {
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.key.trim().is_empty() {
            return Err(ValidationError::Required("Key"));
        }
        if !self.value.is_complete() {
            return Err(ValidationError::IncompleteTranslation("Value"));
        }
        if self.section.trim().is_empty() {
            return Err(ValidationError::Required("Section"));
        }
        Ok(())
    }
}

/// Partial update for content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContentPatch {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Option<Bilingual>,
    #[serde(default, rename = "type")]
    pub content_type: Option<ContentType>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i32>,
}

impl ContentPatch {
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            return Err(ValidationError::Required("Key"));
        }
        if self.value.as_ref().is_some_and(|v| !v.is_complete()) {
            return Err(ValidationError::IncompleteTranslation("Value"));
        }
        if self.section.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err(ValidationError::Required("Section"));
        }
        Ok(())
    }

    /// The `(key, section)` slot the entry will occupy once this patch is applied.
    #[must_use]
    pub fn target_slot<'a>(&'a self, current: &'a Content) -> (&'a str, &'a str) {
        (
            self.key.as_deref().unwrap_or(&current.key),
            self.section.as_deref().unwrap_or(&current.section),
        )
    }

    pub fn apply_to(self, content: &mut Content) {
        if let Some(key) = self.key {
            content.key = key;
        }
        if let Some(value) = self.value {
            content.value = value;
        }
        if let Some(content_type) = self.content_type {
            content.content_type = content_type;
        }
        if let Some(section) = self.section {
            content.section = section;
        }
        if let Some(sort_order) = self.sort_order {
            content.sort_order = sort_order;
        }
    }
}
