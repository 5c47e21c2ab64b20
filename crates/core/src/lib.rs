//! Minh Phat Core - Shared domain types.
//!
//! This crate provides the types used across all Minh Phat components:
//! - `server` - REST API over the catalog, content, newsletter and admin auth
//! - `cli` - Command-line tools for migrations, admin users and session watching
//!
//! # Architecture
//!
//! The core crate contains only types, validation and pure state machines - no I/O,
//! no database access, no HTTP clients. Time is always passed in by the caller.
//!
//! # Modules
//!
//! - [`types`] - Newtypes for IDs, prices, emails, bilingual text and statuses
//! - [`models`] - Catalog, content, newsletter and admin entities with their inputs and patches
//! - [`validation`] - Field validation errors shared by the inputs
//! - [`idle`] - Idle-timeout tracker driving the admin session warning

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod idle;
pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::ValidationError;
