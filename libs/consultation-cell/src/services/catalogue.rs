// libs/consultation-cell/src/services/catalogue.rs
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use shared_database::{PersistenceProvider, UserScope};
use subscription_cell::SubscriptionTier;

use crate::models::{ConsultationError, Persona, DEFAULT_SPECIALTY};

/// Doctor personas offered to a user, loaded through the
/// `get_available_doctors` database function.
#[derive(Clone)]
pub struct PersonaCatalogue {
    store: Arc<dyn PersistenceProvider>,
}

impl PersonaCatalogue {
    pub fn new(store: Arc<dyn PersistenceProvider>) -> Self {
        Self { store }
    }

    async fn load(&self, scope: &UserScope) -> Result<Vec<Persona>, ConsultationError> {
        let result = self
            .store
            .rpc(scope, "get_available_doctors", json!({ "target_user_id": scope.user_id }))
            .await
            .map_err(|e| ConsultationError::Persistence(e.to_string()))?;

        let rows = match result {
            Value::Array(rows) => rows,
            Value::Null => Vec::new(),
            other => vec![other],
        };

        let mut personas: Vec<Persona> = rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<Persona>(row) {
                Ok(persona) => Some(persona),
                Err(e) => {
                    warn!("Skipping malformed doctor row: {}", e);
                    None
                }
            })
            .collect();

        // Stable sort keeps the database order otherwise.
        personas.sort_by_key(|persona| persona.specialty != DEFAULT_SPECIALTY);
        Ok(personas)
    }

    /// Personas the tier may start, default specialty first.
    pub async fn list_for(&self, scope: &UserScope, tier: SubscriptionTier) -> Result<Vec<Persona>, ConsultationError> {
        let personas: Vec<Persona> = self
            .load(scope)
            .await?
            .into_iter()
            .filter(|persona| persona.is_selectable(tier))
            .collect();

        debug!("{} personas selectable for user {} on {} plan", personas.len(), scope.user_id, tier);
        Ok(personas)
    }

    /// Looks a persona up regardless of tier; selection rules apply at start.
    pub async fn find(&self, scope: &UserScope, persona_id: &str) -> Result<Persona, ConsultationError> {
        self.load(scope)
            .await?
            .into_iter()
            .find(|persona| persona.id == persona_id)
            .ok_or_else(|| ConsultationError::PersonaNotFound(persona_id.to_string()))
    }
}
