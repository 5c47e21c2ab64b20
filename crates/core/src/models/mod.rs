//! Domain entities and the inputs that create or patch them.
//!
//! Every entity has a `New*` input (validated before it reaches a store) and,
//! where the API allows edits, a `*Patch` whose absent fields leave the stored
//! value untouched. Nullable fields use `Option<Option<T>>` in patches:
//! `None` keeps the value, `Some(None)` clears it.

pub mod admin;
pub mod category;
pub mod content;
pub mod newsletter;
pub mod product;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer};

pub use admin::{AdminSession, AdminUser, AdminUserView, NewAdminUser, SessionToken};
pub use category::{Category, CategoryPatch, NewCategory};
pub use content::{Content, ContentPatch, NewContent};
pub use newsletter::{NewSubscription, Subscribed, Subscriber};
pub use product::{NewProduct, Nutrition, Product, ProductPatch};

/// The `updatedAt` value for an entity last stamped at `previous`.
///
/// Two updates inside one clock tick still produce strictly increasing stamps.
#[must_use]
pub fn next_update_stamp(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + TimeDelta::microseconds(1)
    }
}

/// Deserialize a present-but-possibly-null field into `Some(value_or_none)`.
///
/// Pair with `#[serde(default)]` so a missing field stays `None`.
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn default_true() -> bool {
    true
}
