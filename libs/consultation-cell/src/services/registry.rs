// libs/consultation-cell/src/services/registry.rs
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use shared_utils::{InFlight, InFlightGuard};

use crate::models::ConsultationError;
use crate::services::session::SessionController;
use crate::services::tavus::ConversationProvider;

/// One `SessionController` per user. Start and end are marked in flight so a
/// duplicate submission is refused while reads simply wait for the lock.
pub struct SessionRegistry {
    provider: Arc<dyn ConversationProvider>,
    sessions: Mutex<HashMap<String, Arc<Mutex<SessionController>>>>,
    in_flight: InFlight,
}

impl SessionRegistry {
    pub fn new(provider: Arc<dyn ConversationProvider>) -> Self {
        Self {
            provider,
            sessions: Mutex::new(HashMap::new()),
            in_flight: InFlight::new(),
        }
    }

    async fn session_for(&self, user_id: &str) -> Arc<Mutex<SessionController>> {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(user_id.to_string())
            .or_insert_with(|| {
                debug!("Creating session controller for user {}", user_id);
                Arc::new(Mutex::new(SessionController::new(self.provider.clone())))
            })
            .clone()
    }

    pub async fn acquire(&self, user_id: &str) -> OwnedMutexGuard<SessionController> {
        self.session_for(user_id).await.lock_owned().await
    }

    /// Claims the user's session for a start or end call. Fails fast while
    /// another one is running.
    pub async fn begin(
        &self,
        user_id: &str,
    ) -> Result<(InFlightGuard, OwnedMutexGuard<SessionController>), ConsultationError> {
        let guard = self
            .in_flight
            .begin(user_id)
            .ok_or(ConsultationError::AlreadyInProgress)?;
        let session = self.acquire(user_id).await;
        Ok((guard, session))
    }

    /// Tears down every session and returns the conversations still open.
    pub async fn shutdown_all(&self) -> Vec<String> {
        let sessions: Vec<Arc<Mutex<SessionController>>> = self.sessions.lock().await.drain().map(|(_, s)| s).collect();

        let mut open = Vec::new();
        for session in sessions {
            if let Some(conversation_id) = session.lock().await.shutdown() {
                open.push(conversation_id);
            }
        }
        open
    }
}
