//! Admin login, logout and session verification.
//!
//! ```text
//! POST /api/auth/login    - Password login, sets the session cookie
//! POST /api/auth/logout   - Ends the session, clears the cookie
//! GET  /api/auth/verify   - Reports the current session and idle settings
//! ```

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use minh_phat_core::AdminUserView;

use crate::db::Store;
use crate::error::AppError;
use crate::extract::ValidJson;
use crate::middleware::{SessionCredential, expired_session_cookie, session_cookie};
use crate::services::Verification;
use crate::state::AppState;

pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/api/auth/login", post(login::<S>))
        .route("/api/auth/logout", post(logout::<S>))
        .route("/api/auth/verify", get(verify::<S>))
}

/// Login form. Both fields are optional here so a missing one is reported
/// as missing credentials rather than a malformed body.
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: AdminUserView,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: &'static str,
}

/// Body of `GET /api/auth/verify`. Only `authenticated` is present for an
/// anonymous caller.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<AdminUserView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_timeout_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning_seconds: Option<u64>,
}

impl VerifyResponse {
    const fn anonymous() -> Self {
        Self {
            authenticated: false,
            user: None,
            expires_at: None,
            idle_timeout_seconds: None,
            warning_seconds: None,
        }
    }
}

/// `POST /api/auth/login`
#[instrument(skip(state, jar, body))]
pub async fn login<S: Store>(
    State(state): State<AppState<S>>,
    jar: CookieJar,
    ValidJson(body): ValidJson<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    let username = body.username.unwrap_or_default();
    let password = body.password.unwrap_or_default();

    let outcome = state.auth().login(&username, &password).await?;
    let token = outcome.session.token.as_str().to_owned();

    let config = state.config();
    let jar = jar.add(session_cookie(
        &token,
        config.session_ttl,
        config.secure_cookies(),
    ));

    Ok((
        jar,
        Json(LoginResponse {
            success: true,
            token,
            expires_at: outcome.session.expires_at,
            user: outcome.user.view(),
        }),
    ))
}

/// `POST /api/auth/logout`
#[instrument(skip_all)]
pub async fn logout<S: Store>(
    State(state): State<AppState<S>>,
    SessionCredential(token): SessionCredential,
    jar: CookieJar,
) -> Result<(CookieJar, Json<LogoutResponse>), AppError> {
    state.auth().logout(token.as_deref()).await?;
    Ok((
        jar.add(expired_session_cookie()),
        Json(LogoutResponse {
            success: true,
            message: "Logged out successfully",
        }),
    ))
}

/// `GET /api/auth/verify`
///
/// Never fails. A token that no longer resolves gets its cookie cleared.
#[instrument(skip_all)]
pub async fn verify<S: Store>(
    State(state): State<AppState<S>>,
    SessionCredential(token): SessionCredential,
    jar: CookieJar,
) -> (CookieJar, Json<VerifyResponse>) {
    match state.auth().verify(token.as_deref()).await {
        Verification::Authenticated(admin) => {
            let idle = state.config().idle;
            (
                jar,
                Json(VerifyResponse {
                    authenticated: true,
                    user: Some(admin.user.view()),
                    expires_at: Some(admin.session.expires_at),
                    idle_timeout_seconds: Some(idle.idle_timeout().as_secs()),
                    warning_seconds: Some(idle.warning_lead().as_secs()),
                }),
            )
        }
        Verification::Anonymous if token.is_some() => (
            jar.add(expired_session_cookie()),
            Json(VerifyResponse::anonymous()),
        ),
        Verification::Anonymous => (jar, Json(VerifyResponse::anonymous())),
    }
}
