// libs/consultation-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;
use crate::state::ConsultationState;

pub fn consultation_routes(config: Arc<AppConfig>) -> Router {
    consultation_routes_with_state(Arc::new(ConsultationState::new(config)))
}

pub fn consultation_routes_with_state(state: Arc<ConsultationState>) -> Router {
    Router::new()
        // Persona catalogue
        .route("/personas", get(list_personas))
        .route("/replicas/{replica_id}/status", get(get_replica_status))
        .route("/conversations/{conversation_id}", get(get_conversation))

        // Session lifecycle
        .route("/start", post(start_consultation))
        .route("/end", post(end_consultation))
        .route("/session", get(get_session))
        .route("/session/mute", post(toggle_mute))
        .route("/session/video", post(toggle_video))

        // Records
        .route("/history", get(get_history))

        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
