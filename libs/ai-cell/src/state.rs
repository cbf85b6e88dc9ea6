use std::sync::Arc;

use tracing::warn;

use shared_config::AppConfig;

use crate::services::{select_provider, AiService, TextGenerationProvider};

pub struct AiState {
    pub config: Arc<AppConfig>,
    pub ai: AiService,
}

impl AiState {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let provider = select_provider(&config);
        if provider.is_none() {
            warn!("No Gemini or OpenAI key configured, analysis endpoints will be unavailable");
        }
        Self::with_provider(config, provider)
    }

    pub fn with_provider(config: Arc<AppConfig>, provider: Option<Arc<dyn TextGenerationProvider>>) -> Self {
        Self {
            config,
            ai: AiService::new(provider),
        }
    }
}
