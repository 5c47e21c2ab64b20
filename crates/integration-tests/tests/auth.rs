//! Login, session verification and logout over HTTP.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use minh_phat_integration_tests::{
    ADMIN_PASSWORD, ADMIN_USERNAME, Backend, TestContext, both_backends, cookie_client, json_body,
};
use minh_phat_server::config::ServerConfig;
use serde_json::json;

async fn login_sets_cookie_and_verify_reports_user(ctx: TestContext) {
    let response = ctx
        .post_json(
            "/api/auth/login",
            &json!({"username": ADMIN_USERNAME, "password": ADMIN_PASSWORD}),
        )
        .await;
    assert_eq!(response.status(), 200);

    let cookie = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .find(|v| v.starts_with("admin_session="))
        .unwrap();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Path=/"));

    let body = json_body(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["user"]["username"], ADMIN_USERNAME);
    assert!(body["user"].get("passwordHash").is_none());
    assert!(!body["token"].as_str().unwrap().is_empty());

    let verify = json_body(ctx.get("/api/auth/verify").await).await;
    assert_eq!(verify["authenticated"], json!(true));
    assert_eq!(verify["user"]["id"], body["user"]["id"]);
    assert_eq!(verify["expiresAt"], body["expiresAt"]);
    assert!(verify["idleTimeoutSeconds"].as_u64().unwrap() > verify["warningSeconds"].as_u64().unwrap());
}
both_backends!(
    test_login_sets_cookie_and_verify_reports_user,
    login_sets_cookie_and_verify_reports_user
);

async fn login_rejections(ctx: TestContext) {
    let response = ctx
        .post_json(
            "/api/auth/login",
            &json!({"username": ADMIN_USERNAME, "password": "not-it"}),
        )
        .await;
    assert_eq!(response.status(), 401);
    assert_eq!(
        json_body(response).await["error"],
        "Invalid username or password"
    );

    let response = ctx
        .post_json("/api/auth/login", &json!({"username": ADMIN_USERNAME}))
        .await;
    assert_eq!(response.status(), 400);

    let verify = json_body(ctx.get("/api/auth/verify").await).await;
    assert_eq!(verify, json!({"authenticated": false}));
}
both_backends!(test_login_rejections, login_rejections);

async fn bearer_token_authenticates(ctx: TestContext) {
    let token = ctx.login().await;

    // A client without the cookie must present the token itself.
    let other = cookie_client();
    let anonymous = other.get(ctx.url("/api/export")).send().await.unwrap();
    assert_eq!(anonymous.status(), 401);

    let authorized = other
        .get(ctx.url("/api/export"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(authorized.status(), 200);

    let garbage = other
        .get(ctx.url("/api/export"))
        .bearer_auth("not-a-session")
        .send()
        .await
        .unwrap();
    assert_eq!(garbage.status(), 401);
    assert_eq!(
        json_body(garbage).await["error"],
        "Invalid or expired session"
    );
}
both_backends!(test_bearer_token_authenticates, bearer_token_authenticates);

async fn logout_ends_session(ctx: TestContext) {
    let token = ctx.login().await;

    let response = ctx.post_json("/api/auth/logout", &json!({})).await;
    assert_eq!(response.status(), 200);
    let cleared = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .any(|v| v.to_str().unwrap().starts_with("admin_session=;"));
    assert!(cleared);
    assert_eq!(
        json_body(response).await["message"],
        "Logged out successfully"
    );

    let verify = json_body(ctx.get("/api/auth/verify").await).await;
    assert_eq!(verify["authenticated"], json!(false));

    let stale = cookie_client()
        .get(ctx.url("/api/export"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(stale.status(), 401);

    // Logging out twice is harmless.
    let again = ctx.post_json("/api/auth/logout", &json!({})).await;
    assert_eq!(again.status(), 200);
}
both_backends!(test_logout_ends_session, logout_ends_session);

async fn expired_session_is_rejected(backend: Backend) {
    let config = ServerConfig {
        session_ttl: Duration::from_secs(1),
        ..ServerConfig::default()
    };
    let ctx = TestContext::start_with(backend, config).await;
    let token = ctx.login().await;

    let client = cookie_client();
    let fresh = client
        .get(ctx.url("/api/auth/verify"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(json_body(fresh).await["authenticated"], json!(true));

    tokio::time::sleep(Duration::from_millis(1_500)).await;

    let expired = client
        .get(ctx.url("/api/auth/verify"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(json_body(expired).await["authenticated"], json!(false));

    let gated = client
        .post(ctx.url("/api/categories"))
        .bearer_auth(&token)
        .json(&json!({"name": {"en": "Late", "vi": "Trễ"}, "slug": "late"}))
        .send()
        .await
        .unwrap();
    assert_eq!(gated.status(), 401);
}

#[tokio::test]
async fn test_expired_session_is_rejected_memory() {
    expired_session_is_rejected(Backend::Memory).await;
}

#[tokio::test]
async fn test_expired_session_is_rejected_sqlite() {
    expired_session_is_rejected(Backend::Sqlite).await;
}
