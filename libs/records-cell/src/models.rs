use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use ai_cell::AiError;

// ==============================================================================
// TREATMENT PLAN MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Active,
    Paused,
    Completed,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Active => "active",
            PlanStatus::Paused => "paused",
            PlanStatus::Completed => "completed",
        }
    }

    /// Column stamped with the transition time, if any.
    pub fn timestamp_column(&self) -> Option<&'static str> {
        match self {
            PlanStatus::Active => Some("started_at"),
            PlanStatus::Paused => None,
            PlanStatus::Completed => Some("completed_at"),
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanStatus {
    type Err = RecordsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(PlanStatus::Active),
            "paused" => Ok(PlanStatus::Paused),
            "completed" => Ok(PlanStatus::Completed),
            other => Err(RecordsError::Validation(format!(
                "Invalid status '{}', expected active, paused or completed",
                other
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTreatmentPlanRequest {
    pub condition: String,
    #[serde(default = "default_severity")]
    pub severity: String,
    pub diagnosis_id: Option<String>,
}

fn default_severity() -> String {
    "moderate".to_string()
}

#[derive(Debug, Deserialize)]
pub struct UpdatePlanStatusRequest {
    pub status: String,
}

// ==============================================================================
// UPLOAD MODELS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    /// Base64 payload, optionally with a `data:<mime>;base64,` prefix.
    pub file: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UploadedFile {
    pub path: String,
    pub public_url: String,
    pub content_type: String,
    pub size: usize,
}

// ==============================================================================
// ERROR HANDLING
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RecordsError {
    #[error("{0}")]
    Validation(String),

    #[error("Treatment plan not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Generation(#[from] AiError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Persistence(String),
}

impl From<RecordsError> for shared_models::error::AppError {
    fn from(err: RecordsError) -> Self {
        use shared_models::error::AppError;
        match err {
            RecordsError::Validation(_) => AppError::ValidationError(err.to_string()),
            RecordsError::NotFound(_) => AppError::NotFound(err.to_string()),
            RecordsError::Generation(inner) => inner.into(),
            RecordsError::Storage(_) => AppError::ExternalService(err.to_string()),
            RecordsError::Persistence(_) => AppError::Database(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_statuses_only() {
        assert_eq!("Active".parse::<PlanStatus>().unwrap(), PlanStatus::Active);
        assert_eq!(" paused".parse::<PlanStatus>().unwrap(), PlanStatus::Paused);
        assert!("archived".parse::<PlanStatus>().is_err());
    }

    #[test]
    fn only_active_and_completed_stamp_times() {
        assert_eq!(PlanStatus::Active.timestamp_column(), Some("started_at"));
        assert_eq!(PlanStatus::Paused.timestamp_column(), None);
        assert_eq!(PlanStatus::Completed.timestamp_column(), Some("completed_at"));
    }
}
