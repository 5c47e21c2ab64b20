//! English/Vietnamese text pairs.

use serde::{Deserialize, Serialize};

/// A display language supported by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Vi,
}

impl Language {
    /// The two-letter code used on the wire and in storage.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Vi => "vi",
        }
    }

    /// Parse a two-letter code, ignoring case.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Self::En),
            "vi" => Some(Self::Vi),
            _ => None,
        }
    }
}

/// A value carried in both languages, always supplied and read as a pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Bilingual {
    #[serde(default)]
    pub en: String,
    #[serde(default)]
    pub vi: String,
}

impl Bilingual {
    #[must_use]
    pub fn new(en: impl Into<String>, vi: impl Into<String>) -> Self {
        Self {
            en: en.into(),
            vi: vi.into(),
        }
    }

    /// The text for one language.
    #[must_use]
    pub fn get(&self, language: Language) -> &str {
        match language {
            Language::En => &self.en,
            Language::Vi => &self.vi,
        }
    }

    /// True when both languages carry non-blank text.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.en.trim().is_empty() && !self.vi.trim().is_empty()
    }

    /// Case-insensitive substring match against either language.
    ///
    /// `needle` must already be lowercased.
    #[must_use]
    pub fn contains_lowercase(&self, needle: &str) -> bool {
        self.en.to_lowercase().contains(needle) || self.vi.to_lowercase().contains(needle)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_is_complete_requires_both_languages() {
        assert!(Bilingual::new("Strawberries", "Dâu tây").is_complete());
        assert!(!Bilingual::new("Strawberries", "  ").is_complete());
        assert!(!Bilingual::default().is_complete());
    }

    #[test]
    fn test_contains_lowercase_handles_vietnamese() {
        let name = Bilingual::new("Fresh Oranges", "Cam Tươi");
        assert!(name.contains_lowercase("orange"));
        assert!(name.contains_lowercase("tươi"));
        assert!(!name.contains_lowercase("apple"));
    }

    #[test]
    fn test_missing_language_defaults_to_empty() {
        let parsed: Bilingual = serde_json::from_str(r#"{"en":"Mango"}"#).unwrap();
        assert_eq!(parsed.en, "Mango");
        assert_eq!(parsed.vi, "");
    }

    #[test]
    fn test_language_codes() {
        assert_eq!(Language::from_code("VI"), Some(Language::Vi));
        assert_eq!(Language::from_code("fr"), None);
        assert_eq!(serde_json::to_string(&Language::Vi).unwrap(), "\"vi\"");
        assert_eq!(Language::En.code(), "en");
    }
}
