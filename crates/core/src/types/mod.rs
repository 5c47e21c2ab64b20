//! Core types for Minh Phat.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod bilingual;
pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use bilingual::{Bilingual, Language};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::Price;
pub use status::*;
