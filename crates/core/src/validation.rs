//! Input validation errors.

use thiserror::Error;

/// A rejected field on a create or update input.
///
/// Messages are user-facing: the API returns them verbatim in the error body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{0} must be provided in both English and Vietnamese")]
    IncompleteTranslation(&'static str),

    #[error("Valid price is required")]
    NonPositivePrice,

    #[error("Original price must be greater than zero")]
    NonPositiveOriginalPrice,

    #[error("Rating must be between 0 and 5")]
    RatingOutOfRange,

    #[error("Slug must contain only lowercase letters, digits and single hyphens")]
    InvalidSlug,

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Language must be 'en' or 'vi'")]
    InvalidLanguage,
}

/// Whether `slug` is lowercase ASCII words joined by single hyphens.
#[must_use]
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .split('-')
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_slugs() {
        assert!(is_valid_slug("citrus"));
        assert!(is_valid_slug("stone-fruits"));
        assert!(is_valid_slug("top-10"));
    }

    #[test]
    fn test_invalid_slugs() {
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("Citrus"));
        assert!(!is_valid_slug("stone--fruits"));
        assert!(!is_valid_slug("-citrus"));
        assert!(!is_valid_slug("trái-cây"));
        assert!(!is_valid_slug("with space"));
    }

    #[test]
    fn test_messages_are_user_facing() {
        assert_eq!(
            ValidationError::Required("Category").to_string(),
            "Category is required"
        );
        assert_eq!(
            ValidationError::IncompleteTranslation("Product name").to_string(),
            "Product name must be provided in both English and Vietnamese"
        );
    }
}
