//! Newsletter subscriptions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Email, Language, SubscriberId, SubscriptionStatus};
use crate::validation::ValidationError;

/// A newsletter subscriber. Email addresses are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub id: SubscriberId,
    pub email: Email,
    pub name: Option<String>,
    pub language: Language,
    pub status: SubscriptionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscriber {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }
}

/// A validated subscription request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscription {
    pub email: Email,
    pub name: Option<String>,
    pub language: Language,
}

impl NewSubscription {
    /// Validate raw request fields.
    ///
    /// A missing language means English; a blank name is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Required`] for a missing email,
    /// [`ValidationError::InvalidEmail`] for a malformed one and
    /// [`ValidationError::InvalidLanguage`] for anything but `en`/`vi`.
    pub fn parse(
        email: Option<&str>,
        language: Option<&str>,
        name: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let raw = email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(ValidationError::Required("Email"))?;
        let email = Email::parse(raw).map_err(|e| ValidationError::InvalidEmail(e.to_string()))?;

        let language = match language {
            None => Language::default(),
            Some(code) => Language::from_code(code).ok_or(ValidationError::InvalidLanguage)?,
        };

        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(ToOwned::to_owned);

        Ok(Self {
            email,
            name,
            language,
        })
    }

    /// Merge a repeat subscription into the stored row: reactivate, take the
    /// new language, and take the new name when one was given.
    pub fn refresh(self, subscriber: &mut Subscriber) {
        subscriber.language = self.language;
        subscriber.status = SubscriptionStatus::Active;
        if self.name.is_some() {
            subscriber.name = self.name;
        }
    }
}

/// Result of a subscribe call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subscribed {
    /// First subscription for this email.
    Created(Subscriber),
    /// The email was already on file; the row was refreshed in place.
    Updated(Subscriber),
}

impl Subscribed {
    #[must_use]
    pub const fn subscriber(&self) -> &Subscriber {
        match self {
            Self::Created(s) | Self::Updated(s) => s,
        }
    }

    #[must_use]
    pub const fn is_new(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults_language_to_english() {
        let sub = NewSubscription::parse(Some("Lan@Example.com"), None, Some("  ")).unwrap();
        assert_eq!(sub.email.as_str(), "lan@example.com");
        assert_eq!(sub.language, Language::En);
        assert_eq!(sub.name, None);
    }

    #[test]
    fn test_parse_rejects_missing_email() {
        assert_eq!(
            NewSubscription::parse(None, Some("vi"), None),
            Err(ValidationError::Required("Email"))
        );
        assert_eq!(
            NewSubscription::parse(Some(" "), None, None),
            Err(ValidationError::Required("Email"))
        );
    }

    #[test]
    fn test_parse_rejects_bad_email_and_language() {
        assert!(matches!(
            NewSubscription::parse(Some("nope"), None, None),
            Err(ValidationError::InvalidEmail(_))
        ));
        assert_eq!(
            NewSubscription::parse(Some("a@b.vn"), Some("fr"), None),
            Err(ValidationError::InvalidLanguage)
        );
    }

    #[test]
    fn test_refresh_reactivates_and_keeps_name() {
        let now = Utc::now();
        let mut subscriber = Subscriber {
            id: SubscriberId::new("s1"),
            email: Email::parse("lan@example.com").unwrap(),
            name: Some("Lan".to_string()),
            language: Language::En,
            status: SubscriptionStatus::Unsubscribed,
            created_at: now,
            updated_at: now,
        };

        NewSubscription::parse(Some("lan@example.com"), Some("vi"), None)
            .unwrap()
            .refresh(&mut subscriber);

        assert!(subscriber.is_active());
        assert_eq!(subscriber.language, Language::Vi);
        assert_eq!(subscriber.name.as_deref(), Some("Lan"));
    }
}
