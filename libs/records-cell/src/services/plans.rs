// libs/records-cell/src/services/plans.rs
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info};

use ai_cell::AiService;
use shared_database::{PersistenceProvider, TableQuery, UserScope};

use crate::models::{CreateTreatmentPlanRequest, PlanStatus, RecordsError};

const TABLE: &str = "treatment_plans";

pub struct TreatmentPlanService {
    ai: Arc<AiService>,
    store: Arc<dyn PersistenceProvider>,
}

impl TreatmentPlanService {
    pub fn new(ai: Arc<AiService>, store: Arc<dyn PersistenceProvider>) -> Self {
        Self { ai, store }
    }

    /// Generates a plan for the condition and stores it as an active plan.
    pub async fn create(&self, scope: &UserScope, request: &CreateTreatmentPlanRequest) -> Result<Value, RecordsError> {
        let plan = self.ai.treatment_plan(&request.condition, &request.severity).await?;
        let now = Utc::now().to_rfc3339();

        let row = json!({
            "diagnosis_id": request.diagnosis_id,
            "condition": request.condition.trim(),
            "severity": request.severity,
            "plan_data": plan,
            "natural_remedies": plan.natural_remedies,
            "recommended_foods": plan.foods,
            "medications": plan.medications,
            "exercises": plan.exercises,
            "daily_schedule": plan.daily_schedule,
            "prevention_tips": plan.prevention_tips,
            "status": PlanStatus::Active,
            "started_at": now,
        });

        let stored = self
            .store
            .insert(scope, TABLE, row)
            .await
            .map_err(|e| RecordsError::Persistence(e.to_string()))?;

        info!("Stored treatment plan for '{}' (user {})", request.condition.trim(), scope.user_id);
        Ok(stored)
    }

    /// Newest first.
    pub async fn list(&self, scope: &UserScope) -> Result<Vec<Value>, RecordsError> {
        self.store
            .select(scope, TABLE, TableQuery::new().order_desc("created_at"))
            .await
            .map_err(|e| RecordsError::Persistence(e.to_string()))
    }

    pub async fn update_status(&self, scope: &UserScope, plan_id: &str, status: &str) -> Result<Value, RecordsError> {
        let status: PlanStatus = status.parse()?;
        let now = Utc::now().to_rfc3339();

        let mut patch = json!({ "status": status, "updated_at": now });
        if let Some(column) = status.timestamp_column() {
            patch[column] = json!(now);
        }

        debug!("Setting treatment plan {} to {}", plan_id, status);
        let updated = self
            .store
            .update(scope, TABLE, TableQuery::new().eq("id", plan_id), patch)
            .await
            .map_err(|e| RecordsError::Persistence(e.to_string()))?;

        updated
            .into_iter()
            .next()
            .ok_or_else(|| RecordsError::NotFound(plan_id.to_string()))
    }
}
