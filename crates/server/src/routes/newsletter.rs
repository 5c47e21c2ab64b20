//! Newsletter signup.

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use minh_phat_core::{Email, Language, NewSubscription, Subscribed, SubscriberId};

use crate::db::Store;
use crate::error::AppError;
use crate::extract::ValidJson;
use crate::state::AppState;

pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new().route("/api/newsletter/subscribe", post(subscribe::<S>))
}

/// Raw signup body; validated into a [`NewSubscription`].
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: Option<String>,
    pub language: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionSummary {
    pub id: SubscriberId,
    pub email: Email,
    pub language: Language,
}

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub message: &'static str,
    pub subscription: SubscriptionSummary,
}

/// `POST /api/newsletter/subscribe`
///
/// 201 for a new address, 200 when an existing row was refreshed.
#[instrument(skip(state, body))]
pub async fn subscribe<S: Store>(
    State(state): State<AppState<S>>,
    ValidJson(body): ValidJson<SubscribeRequest>,
) -> Result<(StatusCode, Json<SubscribeResponse>), AppError> {
    let input = NewSubscription::parse(
        body.email.as_deref(),
        body.language.as_deref(),
        body.name.as_deref(),
    )?;

    let outcome = state.store().subscribe(input).await?;
    let (status, message) = match &outcome {
        Subscribed::Created(_) => (
            StatusCode::CREATED,
            "Successfully subscribed to newsletter",
        ),
        Subscribed::Updated(_) => (StatusCode::OK, "Subscription updated"),
    };

    let subscriber = outcome.subscriber();
    tracing::info!(
        subscriber_id = %subscriber.id,
        created = status == StatusCode::CREATED,
        "Newsletter signup"
    );

    Ok((
        status,
        Json(SubscribeResponse {
            message,
            subscription: SubscriptionSummary {
                id: subscriber.id.clone(),
                email: subscriber.email.clone(),
                language: subscriber.language,
            },
        }),
    ))
}
