// libs/ai-cell/src/router.rs
use std::sync::Arc;

use axum::{middleware, routing::post, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;
use crate::state::AiState;

pub fn analysis_routes_with_state(state: Arc<AiState>) -> Router {
    Router::new()
        .route("/symptoms", post(analyze_symptoms))
        .route("/articles", post(generate_article))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}

pub fn chat_routes_with_state(state: Arc<AiState>) -> Router {
    Router::new()
        .route("/", post(send_message))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}

/// Both routers share one provider.
pub fn ai_routes(config: Arc<AppConfig>) -> (Router, Router) {
    let state = Arc::new(AiState::new(config));
    (analysis_routes_with_state(state.clone()), chat_routes_with_state(state))
}
