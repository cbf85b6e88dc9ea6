// libs/consultation-cell/src/services/tavus.rs
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::models::{ConsultationError, Conversation, ReplicaStatus};

/// Real-time avatar conversation provider.
#[async_trait]
pub trait ConversationProvider: Send + Sync {
    fn is_configured(&self) -> bool;

    async fn create_conversation(
        &self,
        replica_id: &str,
        persona_id: &str,
    ) -> Result<Conversation, ConsultationError>;

    async fn end_conversation(&self, conversation_id: &str) -> Result<(), ConsultationError>;

    async fn get_conversation(&self, conversation_id: &str) -> Result<Conversation, ConsultationError>;

    async fn get_replica_status(&self, replica_id: &str) -> Result<ReplicaStatus, ConsultationError>;
}

/// Tavus conversational video API client.
/// Based on: https://docs.tavus.io/api-reference
pub struct TavusClient {
    client: Client,
    api_key: String,
    base_url: String,
    callback_url: Option<String>,
}

impl TavusClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.tavus_api_key.trim().to_string(),
            base_url: config.tavus_base_url.trim_end_matches('/').to_string(),
            callback_url: config.tavus_callback_url.clone(),
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, action: &str) -> Result<T, ConsultationError> {
        if !self.is_configured() {
            return Err(ConsultationError::NotConfigured);
        }

        let response = request
            .header("x-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        debug!("Tavus {} response: {} - {}", action, status, response_text);

        if !status.is_success() {
            error!("Tavus {} failed: {} - {}", action, status, response_text);
            return Err(ConsultationError::Provider {
                message: format!("HTTP {}: {}", status, response_text),
            });
        }

        // Some endpoints answer with an empty body.
        let body = if response_text.trim().is_empty() { "null" } else { response_text.as_str() };
        serde_json::from_str(body).map_err(|e| ConsultationError::Provider {
            message: format!("Failed to parse {} response: {}", action, e),
        })
    }
}

#[async_trait]
impl ConversationProvider for TavusClient {
    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// POST /conversations
    async fn create_conversation(
        &self,
        replica_id: &str,
        persona_id: &str,
    ) -> Result<Conversation, ConsultationError> {
        info!("Creating Tavus conversation for replica {}", replica_id);

        let mut body = json!({
            "replica_id": replica_id,
            "persona_id": persona_id,
        });
        if let Some(callback_url) = &self.callback_url {
            body["callback_url"] = json!(callback_url);
        }

        let url = format!("{}/conversations", self.base_url);
        let conversation: Conversation = self.send(self.client.post(&url).json(&body), "create conversation").await?;

        info!("Tavus conversation {} created", conversation.conversation_id);
        Ok(conversation)
    }

    /// POST /conversations/{id}/end
    async fn end_conversation(&self, conversation_id: &str) -> Result<(), ConsultationError> {
        info!("Ending Tavus conversation {}", conversation_id);

        let url = format!("{}/conversations/{}/end", self.base_url, conversation_id);
        let _: serde_json::Value = self.send(self.client.post(&url), "end conversation").await?;
        Ok(())
    }

    /// GET /conversations/{id}
    async fn get_conversation(&self, conversation_id: &str) -> Result<Conversation, ConsultationError> {
        let url = format!("{}/conversations/{}", self.base_url, conversation_id);
        self.send(self.client.get(&url), "get conversation").await
    }

    /// GET /replicas/{id}
    async fn get_replica_status(&self, replica_id: &str) -> Result<ReplicaStatus, ConsultationError> {
        let url = format!("{}/replicas/{}", self.base_url, replica_id);
        let replica: serde_json::Value = self.send(self.client.get(&url), "replica status").await?;

        Ok(ReplicaStatus {
            replica_id: replica["replica_id"].as_str().unwrap_or(replica_id).to_string(),
            status: replica["status"].as_str().unwrap_or("unknown").to_string(),
        })
    }
}
