// libs/consultation-cell/src/services/records.rs
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{error, info};

use shared_database::{PersistenceProvider, TableQuery, UserScope};

use crate::models::{ConsultationError, Persona, DEFAULT_SYMPTOMS};

/// Writes the `consultations` history. Failures here never affect the
/// session itself; they are logged and swallowed.
#[derive(Clone)]
pub struct ConsultationRecords {
    store: Arc<dyn PersistenceProvider>,
}

impl ConsultationRecords {
    pub fn new(store: Arc<dyn PersistenceProvider>) -> Self {
        Self { store }
    }

    pub async fn record_start(
        &self,
        scope: &UserScope,
        persona: &Persona,
        conversation_id: &str,
        symptoms: Option<&str>,
    ) {
        let symptoms = symptoms
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SYMPTOMS);

        let row = json!({
            "doctor_id": persona.id,
            "doctor_type": persona.specialty,
            "symptoms": symptoms,
            "tavus_conversation_id": conversation_id,
            "status": "active",
        });

        match self.store.insert(scope, "consultations", row).await {
            Ok(_) => info!("Recorded consultation {} for user {}", conversation_id, scope.user_id),
            Err(e) => error!("Failed to record consultation {}: {}", conversation_id, e),
        }
    }

    pub async fn record_end(&self, scope: &UserScope, conversation_id: &str) {
        let patch = json!({
            "status": "completed",
            "completed_at": Utc::now().to_rfc3339(),
        });
        let query = TableQuery::new().eq("tavus_conversation_id", conversation_id);

        if let Err(e) = self.store.update(scope, "consultations", query, patch).await {
            error!("Failed to complete consultation record {}: {}", conversation_id, e);
        }
    }

    /// Fails with `ConversationNotFound` unless the user has a consultation
    /// row for the conversation.
    pub async fn ensure_owned(&self, scope: &UserScope, conversation_id: &str) -> Result<(), ConsultationError> {
        let rows = self
            .store
            .select(
                scope,
                "consultations",
                TableQuery::new().eq("tavus_conversation_id", conversation_id).limit(1),
            )
            .await
            .map_err(|e| ConsultationError::Persistence(e.to_string()))?;

        if rows.is_empty() {
            return Err(ConsultationError::ConversationNotFound(conversation_id.to_string()));
        }
        Ok(())
    }

    pub async fn history(&self, scope: &UserScope) -> Result<Vec<Value>, ConsultationError> {
        self.store
            .select(scope, "consultations", TableQuery::new().order_desc("created_at"))
            .await
            .map_err(|e| ConsultationError::Persistence(e.to_string()))
    }
}
