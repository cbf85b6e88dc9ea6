use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use subscription_cell::SubscriptionTier;

pub const DEFAULT_SPECIALTY: &str = "General Physician";
pub const DEFAULT_SYMPTOMS: &str = "General consultation";

// ==============================================================================
// PERSONA MODELS
// ==============================================================================

/// A selectable avatar doctor backed by a provider replica.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Persona {
    pub id: String,
    pub name: String,
    pub specialty: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    pub tavus_replica_id: String,
    pub tavus_persona_id: String,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

impl Persona {
    /// Unavailable personas are never selectable; premium ones need a paid plan.
    pub fn is_selectable(&self, tier: SubscriptionTier) -> bool {
        self.is_available && (tier.is_premium() || !self.is_premium)
    }
}

// ==============================================================================
// SESSION MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Connecting,
    Active,
    Ended,
    Errored,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Connecting => "connecting",
            SessionStatus::Active => "active",
            SessionStatus::Ended => "ended",
            SessionStatus::Errored => "errored",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    pub conversation_id: String,
    #[serde(default)]
    pub conversation_url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplicaStatus {
    pub replica_id: String,
    pub status: String,
}

/// Point-in-time view of a session for clients.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub persona: Option<Persona>,
    pub conversation_id: Option<String>,
    pub conversation_url: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_seconds: u64,
    pub duration: String,
    pub muted: bool,
    pub video_enabled: bool,
    pub error: Option<String>,
}

/// Result of ending a session. The session is ended locally even when the
/// provider could not be told.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EndOutcome {
    pub conversation_id: String,
    pub duration_seconds: u64,
    pub provider_error: Option<String>,
}

/// `MM:SS`; minutes keep counting past 59.
pub fn format_duration(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

// ==============================================================================
// REQUEST DTOs
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct StartConsultationRequest {
    pub persona_id: String,
    pub symptoms: Option<String>,
}

// ==============================================================================
// ERROR HANDLING
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConsultationError {
    #[error("Video consultation service not configured")]
    NotConfigured,

    #[error("Doctor not found: {0}")]
    PersonaNotFound(String),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("{0} is only available on a premium plan")]
    PersonaUnavailable(String),

    #[error("A consultation is already in progress")]
    AlreadyInProgress,

    #[error("No active consultation (status: {0})")]
    NotActive(SessionStatus),

    #[error("Conversation provider error: {message}")]
    Provider { message: String },

    #[error("Database error: {0}")]
    Persistence(String),
}

impl From<reqwest::Error> for ConsultationError {
    fn from(err: reqwest::Error) -> Self {
        ConsultationError::Provider {
            message: err.to_string(),
        }
    }
}

impl From<ConsultationError> for shared_models::error::AppError {
    fn from(err: ConsultationError) -> Self {
        use shared_models::error::AppError;
        match err {
            ConsultationError::NotConfigured => AppError::Configuration(err.to_string()),
            ConsultationError::PersonaNotFound(_) | ConsultationError::ConversationNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            ConsultationError::PersonaUnavailable(_) => AppError::Forbidden(err.to_string()),
            ConsultationError::AlreadyInProgress | ConsultationError::NotActive(_) => {
                AppError::Conflict(err.to_string())
            }
            ConsultationError::Provider { .. } => AppError::ExternalService(err.to_string()),
            ConsultationError::Persistence(_) => AppError::Database(err.to_string()),
        }
    }
}
