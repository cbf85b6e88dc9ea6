// libs/ai-cell/src/services/providers.rs
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use shared_config::{AiProvider, AppConfig};

use crate::models::AiError;

const GEMINI_MODEL: &str = "gemini-pro";
const OPENAI_MODEL: &str = "gpt-3.5-turbo";
const SYSTEM_PROMPT: &str = "You are a medical AI assistant. Provide helpful, accurate medical information while emphasizing the importance of consulting healthcare professionals.";

/// Prompt in, free text out.
#[async_trait]
pub trait TextGenerationProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, prompt: &str) -> Result<String, AiError>;
}

async fn send_json(request: RequestBuilder, provider: &str) -> Result<Value, AiError> {
    let response = request
        .header(header::CONTENT_TYPE, "application/json")
        .send()
        .await?;

    let status = response.status();
    let response_text = response.text().await?;

    if !status.is_success() {
        error!("{} API error: {} - {}", provider, status, response_text);
        return Err(AiError::Provider {
            message: format!("{} API error ({}): {}", provider, status, response_text),
        });
    }

    debug!("{} responded with {} bytes", provider, response_text.len());
    serde_json::from_str(&response_text).map_err(|e| AiError::Provider {
        message: format!("Invalid {} response: {}", provider, e),
    })
}

fn missing_text(provider: &str) -> AiError {
    AiError::Provider {
        message: format!("Invalid {} response format", provider),
    }
}

/// Google Gemini `generateContent`.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.gemini_api_key.clone(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TextGenerationProvider for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, GEMINI_MODEL);
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let data = send_json(
            self.client.post(&url).query(&[("key", &self.api_key)]).json(&body),
            "Gemini",
        )
        .await?;

        data["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| missing_text("Gemini"))
    }
}

/// OpenAI chat completions.
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.openai_api_key.clone(),
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TextGenerationProvider for OpenAiClient {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": OPENAI_MODEL,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ],
            "max_tokens": 1500,
            "temperature": 0.7
        });

        let data = send_json(
            self.client
                .post(&url)
                .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
                .json(&body),
            "OpenAI",
        )
        .await?;

        data["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| missing_text("OpenAI"))
    }
}

/// The configured preference wins when its key is set, otherwise whichever
/// provider has a key.
pub fn select_provider(config: &AppConfig) -> Option<Arc<dyn TextGenerationProvider>> {
    let gemini = !config.gemini_api_key.trim().is_empty();
    let openai = !config.openai_api_key.trim().is_empty();

    let chosen = match config.ai_provider {
        AiProvider::Gemini if gemini => Some(AiProvider::Gemini),
        AiProvider::OpenAi if openai => Some(AiProvider::OpenAi),
        _ if gemini => Some(AiProvider::Gemini),
        _ if openai => Some(AiProvider::OpenAi),
        _ => None,
    };

    if let Some(provider) = chosen {
        if provider != config.ai_provider {
            warn!("{} key missing, falling back to {}", config.ai_provider, provider);
        }
        info!("Text generation provider: {}", provider);
    }

    chosen.map(|provider| -> Arc<dyn TextGenerationProvider> {
        match provider {
            AiProvider::Gemini => Arc::new(GeminiClient::new(config)),
            AiProvider::OpenAi => Arc::new(OpenAiClient::new(config)),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use shared_utils::test_utils::TestConfig;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_with(gemini: &str, openai: &str, preferred: AiProvider) -> AppConfig {
        let mut config = TestConfig::default().to_app_config();
        config.gemini_api_key = gemini.to_string();
        config.openai_api_key = openai.to_string();
        config.ai_provider = preferred;
        config
    }

    #[test]
    fn honours_preference_when_key_present() {
        let config = config_with("g", "o", AiProvider::OpenAi);
        assert_eq!(select_provider(&config).map(|p| p.name()), Some("openai"));

        let config = config_with("g", "o", AiProvider::Gemini);
        assert_eq!(select_provider(&config).map(|p| p.name()), Some("gemini"));
    }

    #[test]
    fn falls_back_to_configured_key() {
        let config = config_with("", "o", AiProvider::Gemini);
        assert_eq!(select_provider(&config).map(|p| p.name()), Some("openai"));

        let config = config_with("g", "", AiProvider::OpenAi);
        assert_eq!(select_provider(&config).map(|p| p.name()), Some("gemini"));

        assert!(select_provider(&config_with("", "", AiProvider::Gemini)).is_none());
    }

    #[tokio::test]
    async fn gemini_reads_first_candidate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-pro:generateContent"))
            .and(query_param("key", "test-gemini-key"))
            .and(body_partial_json(json!({ "contents": [{ "parts": [{ "text": "hello" }] }] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "hi there" }] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::new(&TestConfig::with_mock_server(&server.uri()).to_app_config());
        assert_eq!(client.generate("hello").await.unwrap(), "hi there");
    }

    #[tokio::test]
    async fn openai_sends_bearer_and_system_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({ "model": "gpt-3.5-turbo", "max_tokens": 1500 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "answer" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = TestConfig::with_mock_server(&server.uri()).to_app_config();
        config.openai_api_key = "sk-test".to_string();

        assert_eq!(OpenAiClient::new(&config).generate("question").await.unwrap(), "answer");
    }

    #[tokio::test]
    async fn http_failure_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&TestConfig::with_mock_server(&server.uri()).to_app_config());
        assert_matches!(
            client.generate("hello").await,
            Err(AiError::Provider { message }) if message.contains("429")
        );
    }

    #[tokio::test]
    async fn unexpected_shape_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&TestConfig::with_mock_server(&server.uri()).to_app_config());
        assert_matches!(client.generate("hello").await, Err(AiError::Provider { .. }));
    }
}
