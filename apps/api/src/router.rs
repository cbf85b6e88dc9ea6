use std::sync::Arc;

use axum::{
    Json,
    Router,
    extract::State,
    routing::get,
};
use chrono::Utc;
use serde_json::{json, Value};

use ai_cell::ai_routes;
use auth_cell::auth_routes;
use checkout_cell::{checkout_routes_with_state, payment_routes_with_state, CheckoutState};
use consultation_cell::{consultation_routes_with_state, ConsultationState};
use records_cell::records_routes;
use shared_config::AppConfig;
use subscription_cell::subscription_routes;

pub fn create_router(config: Arc<AppConfig>, consultations: Arc<ConsultationState>) -> Router {
    let checkout = Arc::new(CheckoutState::new(config.clone()));
    let (analysis, chat) = ai_routes(config.clone());
    let (reports, uploads) = records_routes(config.clone());

    Router::new()
        .route("/", get(|| async { "Telehealth API is running!" }))
        .route("/health", get(health).with_state(config.clone()))
        .nest("/auth", auth_routes(config.clone()))
        .nest("/payments", payment_routes_with_state(checkout.clone()))
        .nest("/checkout", checkout_routes_with_state(checkout))
        .nest("/subscriptions", subscription_routes(config.clone()))
        .nest("/consultations", consultation_routes_with_state(consultations))
        .nest("/analysis", analysis)
        .nest("/chat", chat)
        .nest("/reports", reports)
        .nest("/upload", uploads)
}

async fn health(State(config): State<Arc<AppConfig>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "environment": config.environment,
        "providers": {
            "supabase": config.is_configured(),
            "tavus": config.is_conversation_configured(),
            "paystack": config.is_payment_configured(),
            "text_generation": config.is_text_generation_configured(),
        }
    }))
}
