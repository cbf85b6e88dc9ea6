// libs/subscription-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use tracing::debug;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::user_scope;

use crate::models::{plan_catalogue, CompleteSubscriptionRequest, SubscribeRequest};
use crate::state::SubscriptionState;

pub async fn list_plans() -> Json<Value> {
    Json(json!({ "plans": plan_catalogue() }))
}

pub async fn get_current_subscription(
    State(state): State<Arc<SubscriptionState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let scope = user_scope(&user, auth.token());

    let tier = state.entitlement.check(&scope).await;
    let subscription = match state.entitlement.current_subscription(&scope).await {
        Ok(row) if tier.is_premium() => row,
        Ok(_) => None,
        Err(e) => {
            debug!("Could not load subscription row for {}: {}", user.id, e);
            None
        }
    };

    Ok(Json(json!({
        "plan_type": tier,
        "is_premium": tier.is_premium(),
        "subscription": subscription,
    })))
}

#[axum::debug_handler]
pub async fn subscribe(
    State(state): State<Arc<SubscriptionState>>,
    Extension(user): Extension<User>,
    Json(request): Json<SubscribeRequest>,
) -> Result<Json<Value>, AppError> {
    debug!("User {} requested {} plan", user.id, request.plan_type);

    let handoff = state
        .subscriptions
        .start_purchase(&user, request.plan_type, request.currency, request.metadata)
        .await?;

    Ok(Json(json!(handoff)))
}

#[axum::debug_handler]
pub async fn complete_subscription(
    State(state): State<Arc<SubscriptionState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CompleteSubscriptionRequest>,
) -> Result<Json<Value>, AppError> {
    let scope = user_scope(&user, auth.token());

    let subscription = state
        .subscriptions
        .complete_purchase(&scope, request.plan_type, &request.reference)
        .await?;

    Ok(Json(json!({
        "success": true,
        "subscription": subscription,
    })))
}
