use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ==============================================================================
// GENERATED CONTENT
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SymptomDiagnosis {
    pub condition: String,
    #[serde(deserialize_with = "lenient_confidence")]
    pub confidence: u8,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub natural_remedies: Vec<String>,
    #[serde(default)]
    pub foods: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub administration: Vec<String>,
    #[serde(default)]
    pub warning: String,
}

/// Models answer with integers, floats or quoted numbers; clamp to 0..=100.
fn lenient_confidence<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    let value = match &raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    };
    value
        .map(|v| v.round().clamp(0.0, 100.0) as u8)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid confidence: {}", raw)))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LifecyclePhases {
    pub phase1: String,
    pub phase2: String,
    pub phase3: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleEntry {
    pub time: String,
    pub activity: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentPlan {
    pub lifecycle_phases: LifecyclePhases,
    #[serde(default)]
    pub natural_remedies: Vec<String>,
    #[serde(default)]
    pub foods: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub exercises: Vec<String>,
    #[serde(default)]
    pub daily_schedule: Vec<ScheduleEntry>,
    #[serde(default)]
    pub prevention_tips: Vec<String>,
    #[serde(default)]
    pub possible_causes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthArticle {
    pub title: String,
    pub overview: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub natural_treatments: Vec<String>,
    #[serde(default)]
    pub evidence: String,
    #[serde(default)]
    pub prevention: Vec<String>,
    #[serde(default)]
    pub seek_help: String,
}

// ==============================================================================
// REQUEST DTOs
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SymptomAnalysisRequest {
    pub symptoms: String,
    #[serde(default)]
    pub body_parts: Vec<String>,
    #[serde(default = "default_severity")]
    pub severity: String,
    #[serde(default)]
    pub duration: String,
}

fn default_severity() -> String {
    "moderate".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ArticleRequest {
    pub topic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

// ==============================================================================
// ERROR HANDLING
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("No text generation provider configured")]
    NotConfigured,

    #[error("{0}")]
    Validation(String),

    #[error("Text generation failed: {message}")]
    Provider { message: String },
}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        AiError::Provider {
            message: err.to_string(),
        }
    }
}

impl From<AiError> for shared_models::error::AppError {
    fn from(err: AiError) -> Self {
        use shared_models::error::AppError;
        match err {
            AiError::NotConfigured => AppError::Configuration(err.to_string()),
            AiError::Validation(_) => AppError::ValidationError(err.to_string()),
            AiError::Provider { .. } => AppError::ExternalService(err.to_string()),
        }
    }
}
