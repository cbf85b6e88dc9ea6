// libs/ai-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::debug;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{ArticleRequest, ChatRequest, SymptomAnalysisRequest};
use crate::state::AiState;

#[axum::debug_handler]
pub async fn analyze_symptoms(
    State(state): State<Arc<AiState>>,
    Extension(user): Extension<User>,
    Json(request): Json<SymptomAnalysisRequest>,
) -> Result<Json<Value>, AppError> {
    debug!("Symptom analysis requested by {}", user.id);

    let diagnosis = state.ai.diagnose_symptoms(&request).await?;

    Ok(Json(json!({
        "diagnosis": diagnosis,
        "provider": state.ai.provider_name(),
    })))
}

#[axum::debug_handler]
pub async fn generate_article(
    State(state): State<Arc<AiState>>,
    Extension(user): Extension<User>,
    Json(request): Json<ArticleRequest>,
) -> Result<Json<Value>, AppError> {
    debug!("Article on '{}' requested by {}", request.topic, user.id);

    let article = state.ai.health_article(&request.topic).await?;

    Ok(Json(json!({ "article": article })))
}

#[axum::debug_handler]
pub async fn send_message(
    State(state): State<Arc<AiState>>,
    Extension(user): Extension<User>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Value>, AppError> {
    debug!("Chat message from {}", user.id);

    let reply = state.ai.chat(&request.message, &request.history).await?;

    Ok(Json(json!({
        "reply": reply,
        "timestamp": Utc::now().to_rfc3339(),
    })))
}
