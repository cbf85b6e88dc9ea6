use std::env;
use std::fmt;
use std::str::FromStr;

use tracing::warn;

/// Which text-generation backend answers analysis and chat prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    Gemini,
    OpenAi,
}

impl FromStr for AiProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(AiProvider::Gemini),
            "openai" => Ok(AiProvider::OpenAi),
            other => Err(format!("unknown AI provider: {}", other)),
        }
    }
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AiProvider::Gemini => write!(f, "gemini"),
            AiProvider::OpenAi => write!(f, "openai"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub storage_bucket: String,
    pub tavus_api_key: String,
    pub tavus_base_url: String,
    pub tavus_callback_url: Option<String>,
    pub paystack_secret_key: String,
    pub paystack_public_key: String,
    pub paystack_base_url: String,
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub ai_provider: AiProvider,
    pub cors_origin: Option<String>,
    pub port: u16,
    pub environment: String,
}

impl Default for AppConfig {
    /// Unconfigured providers with production base URLs.
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_jwt_secret: String::new(),
            storage_bucket: "medical-uploads".to_string(),
            tavus_api_key: String::new(),
            tavus_base_url: "https://tavusapi.com/v2".to_string(),
            tavus_callback_url: None,
            paystack_secret_key: String::new(),
            paystack_public_key: String::new(),
            paystack_base_url: "https://api.paystack.co".to_string(),
            gemini_api_key: String::new(),
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            openai_api_key: String::new(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            ai_provider: AiProvider::Gemini,
            cors_origin: None,
            port: 3001,
            environment: "development".to_string(),
        }
    }
}

fn var_or_empty(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| {
        warn!("{} not set, using empty value", name);
        String::new()
    })
}

fn var_or_default(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| {
        warn!("{} not set, using default", name);
        default.to_string()
    })
}

impl AppConfig {
    pub fn from_env() -> Self {
        let ai_provider = env::var("AI_PROVIDER")
            .ok()
            .and_then(|raw| match raw.parse::<AiProvider>() {
                Ok(provider) => Some(provider),
                Err(e) => {
                    warn!("{}, falling back to gemini", e);
                    None
                }
            })
            .unwrap_or(AiProvider::Gemini);

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3001);

        let config = Self {
            supabase_url: var_or_empty("SUPABASE_URL"),
            supabase_anon_key: var_or_empty("SUPABASE_ANON_PUBLIC_KEY"),
            supabase_jwt_secret: var_or_empty("SUPABASE_JWT_SECRET"),
            storage_bucket: var_or_default("STORAGE_BUCKET", "medical-uploads"),
            tavus_api_key: var_or_empty("TAVUS_API_KEY"),
            tavus_base_url: var_or_default("TAVUS_BASE_URL", "https://tavusapi.com/v2"),
            tavus_callback_url: env::var("TAVUS_CALLBACK_URL").ok(),
            paystack_secret_key: var_or_empty("PAYSTACK_SECRET_KEY"),
            paystack_public_key: var_or_empty("PAYSTACK_PUBLIC_KEY"),
            paystack_base_url: var_or_default("PAYSTACK_BASE_URL", "https://api.paystack.co"),
            gemini_api_key: var_or_empty("GEMINI_API_KEY"),
            gemini_base_url: var_or_default(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            openai_api_key: var_or_empty("OPENAI_API_KEY"),
            openai_base_url: var_or_default("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            ai_provider,
            cors_origin: env::var("CORS_ORIGIN").ok(),
            port,
            environment: var_or_default("APP_ENV", "development"),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_conversation_configured(&self) -> bool {
        !self.tavus_api_key.trim().is_empty() && !self.tavus_base_url.is_empty()
    }

    pub fn is_payment_configured(&self) -> bool {
        !self.paystack_secret_key.is_empty() && !self.paystack_base_url.is_empty()
    }

    pub fn is_text_generation_configured(&self) -> bool {
        !self.gemini_api_key.is_empty() || !self.openai_api_key.is_empty()
    }
}
