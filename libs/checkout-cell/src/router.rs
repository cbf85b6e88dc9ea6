// libs/checkout-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;
use crate::state::CheckoutState;

pub fn checkout_routes(config: Arc<AppConfig>) -> Router {
    checkout_routes_with_state(Arc::new(CheckoutState::new(config)))
}

pub fn checkout_routes_with_state(state: Arc<CheckoutState>) -> Router {
    Router::new()
        .route("/basket", get(get_basket))
        .route("/basket/items", post(add_basket_item))
        .route("/basket/items/{item_id}", put(update_basket_item).delete(remove_basket_item))
        .route("/basket/currency", put(set_basket_currency))
        .route("/", post(start_checkout))
        .route("/complete", post(complete_checkout))
        .route("/orders", get(list_orders))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}

/// Direct payment initialization and verification, shared with the subscription flow's clients.
pub fn payment_routes(config: Arc<AppConfig>) -> Router {
    payment_routes_with_state(Arc::new(CheckoutState::new(config)))
}

pub fn payment_routes_with_state(state: Arc<CheckoutState>) -> Router {
    Router::new()
        .route("/initialize", post(initialize_payment))
        .route("/verify/{reference}", get(verify_payment))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
