// libs/checkout-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use tracing::debug;

use shared_database::TableQuery;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::user_scope;

use crate::models::{
    BasketItem, BasketQuery, CheckoutError, CheckoutRequest, CompleteCheckoutRequest,
    InitializePaymentRequest, PaymentRequest, SetCurrencyRequest, SetQuantityRequest,
};
use crate::services::{generate_reference, validate_reference, CheckoutFlow};
use crate::state::CheckoutState;

fn basket_view(flow: &CheckoutFlow, currency: Option<crate::models::Currency>) -> Value {
    let currency = currency.unwrap_or_else(|| flow.currency());
    json!({
        "items": flow.items(),
        "currency": currency,
        "total": flow.compute_total(currency),
        "pending_references": flow.pending_references(),
    })
}

// ==============================================================================
// BASKET HANDLERS
// ==============================================================================

pub async fn get_basket(
    State(state): State<Arc<CheckoutState>>,
    Extension(user): Extension<User>,
    Query(query): Query<BasketQuery>,
) -> Result<Json<Value>, AppError> {
    let flow = state.registry.acquire(&user.id).await;
    Ok(Json(basket_view(&flow, query.currency)))
}

pub async fn add_basket_item(
    State(state): State<Arc<CheckoutState>>,
    Extension(user): Extension<User>,
    Json(item): Json<BasketItem>,
) -> Result<Json<Value>, AppError> {
    debug!("Adding item {} to basket for user {}", item.id, user.id);

    let mut flow = state.registry.acquire(&user.id).await;
    flow.add_item(item)?;
    Ok(Json(basket_view(&flow, None)))
}

pub async fn update_basket_item(
    State(state): State<Arc<CheckoutState>>,
    Extension(user): Extension<User>,
    Path(item_id): Path<String>,
    Json(request): Json<SetQuantityRequest>,
) -> Result<Json<Value>, AppError> {
    let mut flow = state.registry.acquire(&user.id).await;
    flow.set_quantity(&item_id, request.quantity);
    Ok(Json(basket_view(&flow, None)))
}

pub async fn remove_basket_item(
    State(state): State<Arc<CheckoutState>>,
    Extension(user): Extension<User>,
    Path(item_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let mut flow = state.registry.acquire(&user.id).await;
    flow.remove_item(&item_id);
    Ok(Json(basket_view(&flow, None)))
}

pub async fn set_basket_currency(
    State(state): State<Arc<CheckoutState>>,
    Extension(user): Extension<User>,
    Json(request): Json<SetCurrencyRequest>,
) -> Result<Json<Value>, AppError> {
    let mut flow = state.registry.acquire(&user.id).await;
    flow.set_currency(request.currency);
    Ok(Json(basket_view(&flow, None)))
}

// ==============================================================================
// CHECKOUT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn start_checkout(
    State(state): State<Arc<CheckoutState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<Value>, AppError> {
    let payments = state.payments()?;
    let (_in_flight, mut flow) = state.registry.begin(&user.id).await?;

    if let Some(currency) = request.currency {
        flow.set_currency(currency);
    }

    let handoff = flow.checkout(payments, Some(&user), request.delivery_info).await?;
    Ok(Json(json!(handoff)))
}

#[axum::debug_handler]
pub async fn complete_checkout(
    State(state): State<Arc<CheckoutState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CompleteCheckoutRequest>,
) -> Result<Json<Value>, AppError> {
    validate_reference(&request.reference)?;
    let payments = state.payments()?;
    let (_in_flight, mut flow) = state.registry.begin(&user.id).await?;

    let scope = user_scope(&user, auth.token());
    let result = flow
        .complete(payments, state.store.as_ref(), &scope, &request.reference, request.outcome)
        .await?;

    Ok(Json(json!(result)))
}

pub async fn list_orders(
    State(state): State<Arc<CheckoutState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let scope = user_scope(&user, auth.token());
    let orders = state
        .store
        .select(&scope, "purchases", TableQuery::new().order_desc("created_at"))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!({ "orders": orders })))
}

// ==============================================================================
// PAYMENT PASS-THROUGH HANDLERS
// ==============================================================================

pub async fn initialize_payment(
    State(state): State<Arc<CheckoutState>>,
    Extension(user): Extension<User>,
    Json(request): Json<InitializePaymentRequest>,
) -> Result<Json<Value>, AppError> {
    let payments = state.payments()?;

    let email = match request.email.filter(|email| !email.trim().is_empty()) {
        Some(email) => email,
        None => user
            .contact_email()
            .map(str::to_string)
            .ok_or_else(|| CheckoutError::Validation("Email is required".to_string()))?,
    };

    let reference = generate_reference();
    let payment = PaymentRequest {
        email,
        amount: request.amount,
        currency: request.currency,
        metadata: request.metadata,
    };

    let initialization = payments.initialize_payment(&payment, &reference).await?;

    Ok(Json(json!({
        "status": true,
        "data": initialization,
    })))
}

pub async fn verify_payment(
    State(state): State<Arc<CheckoutState>>,
    Path(reference): Path<String>,
) -> Result<Json<Value>, AppError> {
    let payments = state.payments()?;
    let verification = payments.verify_payment(&reference).await?;

    Ok(Json(json!({
        "status": verification.is_success(),
        "data": verification,
    })))
}
