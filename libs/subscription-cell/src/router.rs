// libs/subscription-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;
use crate::state::SubscriptionState;

pub fn subscription_routes(config: Arc<AppConfig>) -> Router {
    subscription_routes_with_state(Arc::new(SubscriptionState::new(config)))
}

pub fn subscription_routes_with_state(state: Arc<SubscriptionState>) -> Router {
    let public_routes = Router::new()
        .route("/plans", get(list_plans));

    let protected_routes = Router::new()
        .route("/", post(subscribe))
        .route("/complete", post(complete_subscription))
        .route("/current", get(get_current_subscription))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
