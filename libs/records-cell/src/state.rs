use std::sync::Arc;

use ai_cell::{select_provider, AiService};
use shared_config::AppConfig;
use shared_database::{PersistenceProvider, SupabaseClient, SupabaseStore};

use crate::services::{TreatmentPlanService, UploadService};

pub struct RecordsState {
    pub config: Arc<AppConfig>,
    pub plans: TreatmentPlanService,
    pub uploads: UploadService,
}

impl RecordsState {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let supabase = Arc::new(SupabaseClient::new(&config));
        let store = Arc::new(SupabaseStore::new(supabase.clone()));
        let ai = Arc::new(AiService::new(select_provider(&config)));

        Self::with_providers(config, ai, store, supabase)
    }

    pub fn with_providers(
        config: Arc<AppConfig>,
        ai: Arc<AiService>,
        store: Arc<dyn PersistenceProvider>,
        supabase: Arc<SupabaseClient>,
    ) -> Self {
        Self {
            plans: TreatmentPlanService::new(ai, store),
            uploads: UploadService::new(supabase, config.storage_bucket.clone()),
            config,
        }
    }
}
