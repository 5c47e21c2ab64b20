//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Username/password login with server-side sessions
//! - `sweeper` - Background removal of expired sessions

pub mod auth;
pub mod sweeper;

pub use auth::{AuthError, AuthService, CurrentAdmin, LoginOutcome, Verification};
pub use sweeper::spawn_session_sweeper;
