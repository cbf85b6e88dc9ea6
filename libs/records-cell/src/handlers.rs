// libs/records-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use tracing::debug;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::user_scope;

use crate::models::{CreateTreatmentPlanRequest, UpdatePlanStatusRequest, UploadRequest};
use crate::state::RecordsState;

#[axum::debug_handler]
pub async fn create_treatment_plan(
    State(state): State<Arc<RecordsState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateTreatmentPlanRequest>,
) -> Result<Json<Value>, AppError> {
    debug!("Treatment plan for '{}' requested by {}", request.condition, user.id);
    let scope = user_scope(&user, auth.token());

    let plan = state.plans.create(&scope, &request).await?;

    Ok(Json(json!({ "report": plan })))
}

pub async fn list_treatment_plans(
    State(state): State<Arc<RecordsState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let scope = user_scope(&user, auth.token());

    let plans = state.plans.list(&scope).await?;

    Ok(Json(json!({ "reports": plans })))
}

#[axum::debug_handler]
pub async fn update_treatment_plan_status(
    State(state): State<Arc<RecordsState>>,
    Path(plan_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdatePlanStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let scope = user_scope(&user, auth.token());

    let plan = state.plans.update_status(&scope, &plan_id, &request.status).await?;

    Ok(Json(json!({ "report": plan })))
}

#[axum::debug_handler]
pub async fn upload_file(
    State(state): State<Arc<RecordsState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UploadRequest>,
) -> Result<Json<Value>, AppError> {
    let scope = user_scope(&user, auth.token());

    let file = state.uploads.upload(&scope, &request).await?;

    Ok(Json(json!({
        "success": true,
        "file": file,
    })))
}
