use std::sync::Arc;

use tracing::{info, warn};

use shared_config::AppConfig;
use shared_database::{PersistenceProvider, SupabaseClient, SupabaseStore};
use subscription_cell::EntitlementService;

use crate::services::{
    ConsultationRecords, ConversationProvider, EndReconciler, PersonaCatalogue, SessionRegistry,
    TavusClient,
};

pub struct ConsultationState {
    pub config: Arc<AppConfig>,
    pub conversations: Arc<dyn ConversationProvider>,
    pub entitlement: EntitlementService,
    pub catalogue: PersonaCatalogue,
    pub records: ConsultationRecords,
    pub sessions: SessionRegistry,
    pub reconciler: EndReconciler,
}

impl ConsultationState {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let conversations = Arc::new(TavusClient::new(&config));
        if !conversations.is_configured() {
            warn!("Tavus API key missing; consultations cannot be started");
        }
        let store = Arc::new(SupabaseStore::new(Arc::new(SupabaseClient::new(&config))));

        Self::with_providers(config, conversations, store)
    }

    pub fn with_providers(
        config: Arc<AppConfig>,
        conversations: Arc<dyn ConversationProvider>,
        store: Arc<dyn PersistenceProvider>,
    ) -> Self {
        Self {
            config,
            entitlement: EntitlementService::new(store.clone()),
            catalogue: PersonaCatalogue::new(store.clone()),
            records: ConsultationRecords::new(store),
            sessions: SessionRegistry::new(conversations.clone()),
            reconciler: EndReconciler::new(conversations.clone()),
            conversations,
        }
    }

    /// Stops every session and makes one attempt to end open conversations.
    pub async fn shutdown(&self) {
        let open = self.sessions.shutdown_all().await;
        for conversation_id in open {
            match self.conversations.end_conversation(&conversation_id).await {
                Ok(()) => info!("Ended conversation {} on shutdown", conversation_id),
                Err(e) => warn!("Conversation {} left open on shutdown: {}", conversation_id, e),
            }
        }
    }
}
