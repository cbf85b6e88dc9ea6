// libs/records-cell/src/router.rs
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;
use crate::state::RecordsState;

/// Base64 inflates payloads by a third; this admits files of roughly 15 MB.
const UPLOAD_BODY_LIMIT: usize = 20 * 1024 * 1024;

pub fn records_routes(config: Arc<AppConfig>) -> (Router, Router) {
    let state = Arc::new(RecordsState::new(config));
    (report_routes_with_state(state.clone()), upload_routes_with_state(state))
}

pub fn report_routes_with_state(state: Arc<RecordsState>) -> Router {
    Router::new()
        .route("/treatment-plans", get(list_treatment_plans).post(create_treatment_plan))
        .route("/treatment-plans/{plan_id}/status", put(update_treatment_plan_status))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}

pub fn upload_routes_with_state(state: Arc<RecordsState>) -> Router {
    Router::new()
        .route("/", post(upload_file))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
