// libs/consultation-cell/src/handlers.rs
use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use tracing::{debug, error};

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::user_scope;

use crate::models::StartConsultationRequest;
use crate::state::ConsultationState;

/// Provider calls run on their own task so a dropped request cannot leave a
/// session half-way through a transition.
async fn detached<T, F>(work: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    tokio::spawn(work).await.map_err(|e| {
        error!("Consultation task failed: {}", e);
        AppError::Internal("Consultation task failed".to_string())
    })
}

// ==============================================================================
// PERSONA HANDLERS
// ==============================================================================

pub async fn list_personas(
    State(state): State<Arc<ConsultationState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let scope = user_scope(&user, auth.token());
    let tier = state.entitlement.check(&scope).await;
    let personas = state.catalogue.list_for(&scope, tier).await?;

    Ok(Json(json!({
        "plan_type": tier,
        "personas": personas,
    })))
}

pub async fn get_replica_status(
    State(state): State<Arc<ConsultationState>>,
    Path(replica_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let status = state.conversations.get_replica_status(&replica_id).await?;
    Ok(Json(json!(status)))
}

pub async fn get_conversation(
    State(state): State<Arc<ConsultationState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let scope = user_scope(&user, auth.token());
    state.records.ensure_owned(&scope, &conversation_id).await?;

    let conversation = state.conversations.get_conversation(&conversation_id).await?;
    Ok(Json(json!(conversation)))
}

// ==============================================================================
// SESSION HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn start_consultation(
    State(state): State<Arc<ConsultationState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<StartConsultationRequest>,
) -> Result<Json<Value>, AppError> {
    let scope = user_scope(&user, auth.token());
    debug!("User {} starting consultation with {}", user.id, request.persona_id);

    let (_in_flight, mut session) = state.sessions.begin(&user.id).await?;
    let tier = state.entitlement.check(&scope).await;
    let persona = state.catalogue.find(&scope, &request.persona_id).await?;

    let (session, result) = detached({
        let persona = persona.clone();
        async move {
            let result = session.start(persona, tier).await;
            (session, result)
        }
    })
    .await?;

    let conversation = result?;
    state
        .records
        .record_start(&scope, &persona, &conversation.conversation_id, request.symptoms.as_deref())
        .await;

    Ok(Json(json!({ "session": session.snapshot() })))
}

#[axum::debug_handler]
pub async fn end_consultation(
    State(state): State<Arc<ConsultationState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let scope = user_scope(&user, auth.token());
    let (_in_flight, mut session) = state.sessions.begin(&user.id).await?;

    let (session, result) = detached(async move {
        let result = session.end().await;
        (session, result)
    })
    .await?;

    let outcome = result?;
    if outcome.provider_error.is_some() {
        state.reconciler.enqueue(&outcome.conversation_id).await;
    }
    state.records.record_end(&scope, &outcome.conversation_id).await;

    Ok(Json(json!({
        "session": session.snapshot(),
        "outcome": outcome,
    })))
}

pub async fn get_session(
    State(state): State<Arc<ConsultationState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let session = state.sessions.acquire(&user.id).await;
    Ok(Json(json!({ "session": session.snapshot() })))
}

pub async fn toggle_mute(
    State(state): State<Arc<ConsultationState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let mut session = state.sessions.acquire(&user.id).await;
    Ok(Json(json!({ "muted": session.toggle_mute() })))
}

pub async fn toggle_video(
    State(state): State<Arc<ConsultationState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let mut session = state.sessions.acquire(&user.id).await;
    Ok(Json(json!({ "video_enabled": session.toggle_video() })))
}

// ==============================================================================
// HISTORY HANDLERS
// ==============================================================================

pub async fn get_history(
    State(state): State<Arc<ConsultationState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let scope = user_scope(&user, auth.token());
    let consultations = state.records.history(&scope).await?;

    Ok(Json(json!({ "consultations": consultations })))
}
