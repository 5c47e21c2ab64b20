//! Request extractors that reject with the API's JSON error body.
//!
//! axum's own `Json` and `Query` reject with plain-text bodies; these wrap
//! them and turn every rejection into [`AppError::Validation`].

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// JSON body extractor with a 400 `{"error": ...}` rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Query-string extractor with a 400 `{"error": ...}` rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{StatusCode, header},
        routing::{get, post},
    };
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Deserialize)]
    struct Paging {
        page: Option<u32>,
    }

    #[derive(Deserialize)]
    struct Login {
        username: String,
    }

    fn app() -> Router {
        Router::new()
            .route(
                "/q",
                get(|ValidQuery(p): ValidQuery<Paging>| async move {
                    p.page.unwrap_or(1).to_string()
                }),
            )
            .route(
                "/j",
                post(|ValidJson(l): ValidJson<Login>| async move { l.username }),
            )
    }

    async fn error_of(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_bad_query_is_json_400() {
        let response = app()
            .oneshot(
                axum::http::Request::get("/q?page=abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(error_of(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_malformed_json_is_json_400() {
        let response = app()
            .oneshot(
                axum::http::Request::post("/j")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(error_of(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_valid_inputs_pass_through() {
        let response = app()
            .oneshot(
                axum::http::Request::post("/j")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"username":"admin"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
