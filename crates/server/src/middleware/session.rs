//! Session cookie handling.
//!
//! The session token is an opaque value issued at login. Clients send it back
//! either in the `admin_session` cookie or as `Authorization: Bearer <token>`.

use axum::http::{HeaderMap, header};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "admin_session";

/// Build the session cookie for `token`, expiring with the server session.
#[must_use]
pub fn session_cookie(token: &str, ttl: std::time::Duration, secure: bool) -> Cookie<'static> {
    let max_age = time::Duration::seconds(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX));
    Cookie::build((SESSION_COOKIE_NAME, token.to_owned()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .max_age(max_age)
        .build()
}

/// A cookie that makes the browser drop the session cookie.
#[must_use]
pub fn expired_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .build();
    cookie.make_removal();
    cookie
}

/// The session token carried by a request, bearer header first.
#[must_use]
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_owned());
    }

    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE_NAME)
        .map(|c| c.value().to_owned())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::time::Duration;

    #[test]
    fn test_session_cookie_attributes() {
        let rendered = session_cookie("abc123", Duration::from_secs(900), false).to_string();
        assert!(rendered.starts_with("admin_session=abc123"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("SameSite=Strict"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("Max-Age=900"));
        assert!(!rendered.contains("Secure"));

        let secure = session_cookie("abc123", Duration::from_secs(900), true).to_string();
        assert!(secure.contains("Secure"));
    }

    #[test]
    fn test_expired_cookie_clears() {
        let rendered = expired_session_cookie().to_string();
        assert!(rendered.starts_with("admin_session=;"));
        assert!(rendered.contains("Max-Age=0"));
    }

    #[test]
    fn test_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; admin_session=tok"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("tok"));
    }

    #[test]
    fn test_bearer_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("admin_session=cookie"));
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer header"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("header"));
    }

    #[test]
    fn test_no_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        headers.insert(header::COOKIE, HeaderValue::from_static("admin_session="));
        assert_eq!(session_token(&headers), None);
    }
}
