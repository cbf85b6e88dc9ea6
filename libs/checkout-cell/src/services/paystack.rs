// libs/checkout-cell/src/services/paystack.rs
use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use regex::Regex;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::models::{CheckoutError, PaymentInitialization, PaymentRequest, PaymentVerification};

/// Card payment provider behind the checkout and subscription flows.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Key the client-side modal is opened with.
    fn public_key(&self) -> &str;

    async fn initialize_payment(
        &self,
        request: &PaymentRequest,
        reference: &str,
    ) -> Result<PaymentInitialization, CheckoutError>;

    async fn verify_payment(&self, reference: &str) -> Result<PaymentVerification, CheckoutError>;
}

/// Converts a major-unit amount to the provider's minor units (kobo, cents).
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

const REFERENCE_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// `ref_{unix millis}_{9 random base-36 chars}`
pub fn generate_reference() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| REFERENCE_ALPHABET[rng.gen_range(0..REFERENCE_ALPHABET.len())] as char)
        .collect();
    format!("ref_{}_{}", Utc::now().timestamp_millis(), suffix)
}

fn reference_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.=-]+$").ok()).as_ref()
}

pub fn validate_reference(reference: &str) -> Result<(), CheckoutError> {
    let well_formed = reference_pattern().is_some_and(|pattern| pattern.is_match(reference));
    if reference.len() > 100 || !well_formed {
        return Err(CheckoutError::Validation(format!(
            "Invalid payment reference: {}",
            reference
        )));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct PaystackEnvelope<T> {
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct PaystackVerifyData {
    reference: String,
    status: String,
    amount: Option<i64>,
    currency: Option<String>,
    gateway_response: Option<String>,
    #[serde(default)]
    metadata: Value,
}

/// Paystack transaction API client.
/// Based on: https://paystack.com/docs/api/transaction/
pub struct PaystackClient {
    client: Client,
    secret_key: String,
    public_key: String,
    base_url: String,
}

impl std::fmt::Debug for PaystackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaystackClient")
            .field("public_key", &self.public_key)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl PaystackClient {
    pub fn new(config: &AppConfig) -> Result<Self, CheckoutError> {
        if !config.is_payment_configured() {
            return Err(CheckoutError::NotConfigured);
        }

        Ok(Self {
            client: Client::new(),
            secret_key: config.paystack_secret_key.clone(),
            public_key: config.paystack_public_key.clone(),
            base_url: config.paystack_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        action: &str,
    ) -> Result<T, CheckoutError> {
        let response = request
            .header("Authorization", format!("Bearer {}", self.secret_key))
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        debug!("Paystack {} response: {} - {}", action, status, response_text);

        if !status.is_success() {
            error!("Paystack {} failed: {} - {}", action, status, response_text);
            return Err(CheckoutError::Provider {
                message: format!("HTTP {}: {}", status, response_text),
            });
        }

        let envelope: PaystackEnvelope<T> = serde_json::from_str(&response_text)
            .map_err(|e| CheckoutError::Provider {
                message: format!("Failed to parse {} response: {}", action, e),
            })?;

        if !envelope.status {
            error!("Paystack {} rejected: {}", action, envelope.message);
            return Err(CheckoutError::Provider { message: envelope.message });
        }

        envelope.data.ok_or_else(|| CheckoutError::Provider {
            message: format!("Paystack {} response had no data", action),
        })
    }
}

#[async_trait]
impl PaymentProvider for PaystackClient {
    fn public_key(&self) -> &str {
        &self.public_key
    }

    /// POST /transaction/initialize
    async fn initialize_payment(
        &self,
        request: &PaymentRequest,
        reference: &str,
    ) -> Result<PaymentInitialization, CheckoutError> {
        validate_reference(reference)?;
        let amount = to_minor_units(request.amount);
        if amount <= 0 {
            return Err(CheckoutError::Validation("Amount must be greater than zero".to_string()));
        }

        info!("Initializing Paystack payment {} for {} {}", reference, amount, request.currency);

        let url = format!("{}/transaction/initialize", self.base_url);
        let body = json!({
            "email": request.email,
            "amount": amount,
            "currency": request.currency,
            "reference": reference,
            "metadata": if request.metadata.is_null() { json!({}) } else { request.metadata.clone() },
        });

        let data: Value = self.send(self.client.post(&url).json(&body), "initialize").await?;

        Ok(PaymentInitialization {
            reference: data["reference"].as_str().unwrap_or(reference).to_string(),
            access_code: data["access_code"].as_str().map(str::to_string),
            authorization_url: data["authorization_url"].as_str().map(str::to_string),
        })
    }

    /// GET /transaction/verify/{reference}
    async fn verify_payment(&self, reference: &str) -> Result<PaymentVerification, CheckoutError> {
        validate_reference(reference)?;
        info!("Verifying Paystack payment {}", reference);

        let url = format!("{}/transaction/verify/{}", self.base_url, reference);
        let data: PaystackVerifyData = self.send(self.client.get(&url), "verify").await?;

        Ok(PaymentVerification {
            reference: data.reference,
            status: data.status,
            amount: data.amount,
            currency: data.currency,
            gateway_response: data.gateway_response,
            metadata: data.metadata,
        })
    }
}
