//! Admin authentication extractors.
//!
//! Gated handlers take [`RequireAdmin`]; it resolves the session token from
//! the request and rejects with 401 plus a cleared session cookie when the
//! session is missing, expired or revoked.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;

use crate::db::Store;
use crate::error::{AppError, set_sentry_user};
use crate::services::{AuthError, CurrentAdmin};
use crate::state::AppState;

use super::session::{expired_session_cookie, session_token};

/// Extractor that requires a live admin session.
///
/// # Example
///
/// ```rust,ignore
/// async fn delete_product(RequireAdmin(admin): RequireAdmin) -> impl IntoResponse {
///     tracing::info!(user = %admin.user.username, "deleting");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub CurrentAdmin);

/// Rejection for [`RequireAdmin`].
#[derive(Debug)]
pub struct AuthRejection(pub AuthError);

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let error = AppError::Auth(self.0);
        if error.status().is_client_error() {
            let jar = CookieJar::new().add(expired_session_cookie());
            (jar, error).into_response()
        } else {
            error.into_response()
        }
    }
}

impl<S: Store> FromRequestParts<AppState<S>> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers);
        let admin = state
            .auth()
            .authenticate(token.as_deref())
            .await
            .map_err(AuthRejection)?;

        set_sentry_user(admin.user.id.as_str(), &admin.user.username);
        tracing::Span::current().record("admin_user", admin.user.username.as_str());

        Ok(Self(admin))
    }
}

/// The session token the request carries, if any. Never rejects.
#[derive(Debug, Clone, Default)]
pub struct SessionCredential(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for SessionCredential {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_token(&parts.headers)))
    }
}

/// Header that asks list endpoints for the unfiltered admin view.
pub const ADMIN_VIEW_HEADER: &str = "x-admin";

/// Whether the request set `x-admin: true`.
///
/// The header widens list results to include inactive items; it does not
/// grant any write access.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminView(pub bool);

impl<S: Send + Sync> FromRequestParts<S> for AdminView {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let on = parts
            .headers
            .get(ADMIN_VIEW_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
        Ok(Self(on))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
        routing::get,
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::config::ServerConfig;
    use crate::db::MemoryStore;
    use crate::services::auth::hash_password;
    use minh_phat_core::NewAdminUser;

    async fn state() -> AppState<MemoryStore> {
        let store = MemoryStore::new();
        store
            .create_admin_user(NewAdminUser {
                username: "admin".to_string(),
                password_hash: hash_password("admin123").unwrap(),
                full_name: None,
                email: None,
                is_active: true,
            })
            .await
            .unwrap();
        AppState::new(ServerConfig::default(), Arc::new(store))
    }

    async fn whoami(RequireAdmin(admin): RequireAdmin) -> String {
        admin.user.username
    }

    async fn view(AdminView(on): AdminView) -> &'static str {
        if on { "admin" } else { "public" }
    }

    fn app(state: AppState<MemoryStore>) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .route("/view", get(view))
            .with_state(state)
    }

    #[tokio::test]
    async fn test_missing_session_is_rejected_and_cookie_cleared() {
        let response = app(state().await)
            .oneshot(Request::get("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("admin_session=;"));
    }

    #[tokio::test]
    async fn test_bearer_session_is_accepted() {
        let state = state().await;
        let outcome = state.auth().login("admin", "admin123").await.unwrap();

        let response = app(state)
            .oneshot(
                Request::get("/whoami")
                    .header(
                        header::AUTHORIZATION,
                        format!("Bearer {}", outcome.session.token.as_str()),
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_view_header() {
        let router = app(state().await);
        let response = router
            .clone()
            .oneshot(
                Request::get("/view")
                    .header(ADMIN_VIEW_HEADER, "true")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), 64).await.unwrap();
        assert_eq!(&body[..], b"admin");

        let response = router
            .oneshot(Request::get("/view").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), 64).await.unwrap();
        assert_eq!(&body[..], b"public");
    }
}
