//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (`http_request` span)
//! 3. Request ID (propagate or mint `x-request-id`)
//! 4. CORS and security headers
//!
//! Authentication is not a layer: gated handlers take [`RequireAdmin`].

pub mod auth;
pub mod request_id;
pub mod session;

pub use auth::{AdminView, AuthRejection, RequireAdmin, SessionCredential};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use session::{SESSION_COOKIE_NAME, expired_session_cookie, session_cookie, session_token};
