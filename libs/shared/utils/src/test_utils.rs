use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;

use shared_config::{AiProvider, AppConfig};
use shared_database::{PersistenceProvider, TableQuery, UserScope};
use shared_database::store::scoped_row;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub provider_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            provider_url: "http://localhost:9".to_string(),
        }
    }
}

impl TestConfig {
    /// Points Supabase and every third-party provider at one mock server.
    pub fn with_mock_server(uri: &str) -> Self {
        Self {
            supabase_url: uri.to_string(),
            provider_url: uri.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            storage_bucket: "test-uploads".to_string(),
            tavus_api_key: "test-tavus-key".to_string(),
            tavus_base_url: self.provider_url.clone(),
            tavus_callback_url: None,
            paystack_secret_key: "sk_test_secret".to_string(),
            paystack_public_key: "pk_test_public".to_string(),
            paystack_base_url: self.provider_url.clone(),
            gemini_api_key: "test-gemini-key".to_string(),
            gemini_base_url: self.provider_url.clone(),
            openai_api_key: String::new(),
            openai_base_url: self.provider_url.clone(),
            ai_provider: AiProvider::Gemini,
            cors_origin: None,
            port: 0,
            environment: "test".to_string(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "authenticated".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "authenticated")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }

    pub fn scope(&self) -> UserScope {
        UserScope::new(self.id.clone(), "test-token")
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// In-memory `PersistenceProvider` with the same user scoping as the Supabase store.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    rpc_results: Mutex<HashMap<String, Value>>,
    failing: Mutex<bool>,
    calls: Mutex<Vec<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a row as-is, bypassing scoping, for test setup.
    pub fn seed(&self, table: &str, row: Value) {
        let mut tables = self.tables.lock().unwrap();
        tables.entry(table.to_string()).or_default().push(row);
    }

    pub fn set_rpc_result(&self, function: &str, result: Value) {
        self.rpc_results.lock().unwrap().insert(function.to_string(), result);
    }

    /// Makes every subsequent call fail.
    pub fn fail_all(&self) {
        *self.failing.lock().unwrap() = true;
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables.lock().unwrap().get(table).cloned().unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if *self.failing.lock().unwrap() {
            return Err(anyhow!("API error (500): store unavailable"));
        }
        Ok(())
    }

    fn matches(row: &Value, scope: &UserScope, query: &TableQuery) -> bool {
        if row["user_id"].as_str() != Some(scope.user_id.as_str()) {
            return false;
        }
        query.filters.iter().all(|(column, expected)| {
            match &row[column] {
                Value::String(s) => s == expected,
                Value::Null => false,
                other => &other.to_string() == expected,
            }
        })
    }
}

#[async_trait]
impl PersistenceProvider for InMemoryStore {
    async fn select(&self, scope: &UserScope, table: &str, query: TableQuery) -> Result<Vec<Value>> {
        self.record(format!("select:{}", table))?;

        let mut rows: Vec<Value> = self.rows(table)
            .into_iter()
            .filter(|row| Self::matches(row, scope, &query))
            .collect();

        if let Some((column, ascending)) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = a[column].as_str().unwrap_or("").cmp(b[column].as_str().unwrap_or(""));
                if *ascending { ordering } else { ordering.reverse() }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, scope: &UserScope, table: &str, row: Value) -> Result<Value> {
        self.record(format!("insert:{}", table))?;

        let mut row = scoped_row(scope, row)?;
        if row.get("id").is_none() {
            row["id"] = json!(Uuid::new_v4().to_string());
        }
        if row.get("created_at").is_none() {
            row["created_at"] = json!(Utc::now().to_rfc3339());
        }
        self.seed(table, row.clone());
        Ok(row)
    }

    async fn update(&self, scope: &UserScope, table: &str, query: TableQuery, patch: Value) -> Result<Vec<Value>> {
        self.record(format!("update:{}", table))?;

        let patch = patch.as_object().cloned().ok_or_else(|| anyhow!("Patch must be a JSON object"))?;
        let mut tables = self.tables.lock().unwrap();
        let mut updated = Vec::new();
        for row in tables.entry(table.to_string()).or_default().iter_mut() {
            if Self::matches(row, scope, &query) {
                for (key, value) in &patch {
                    if key != "user_id" {
                        row[key] = value.clone();
                    }
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn rpc(&self, _scope: &UserScope, function: &str, _args: Value) -> Result<Value> {
        self.record(format!("rpc:{}", function))?;
        Ok(self.rpc_results.lock().unwrap().get(function).cloned().unwrap_or(json!([])))
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn user_profile_response(user_id: &str) -> Value {
        json!({
            "id": user_id,
            "email": "test@example.com",
            "role": "authenticated",
            "user_metadata": { "name": "Test User" },
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn persona_response(id: &str, specialty: &str, is_premium: bool, is_available: bool) -> Value {
        json!({
            "id": id,
            "name": format!("Dr. {}", specialty),
            "specialty": specialty,
            "description": format!("{} consultations", specialty),
            "icon": "🩺",
            "tavus_replica_id": format!("r_{}", id),
            "tavus_persona_id": format!("p_{}", id),
            "is_premium": is_premium,
            "is_available": is_available
        })
    }

    pub fn subscription_response(user_id: &str, plan_type: &str) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "user_id": user_id,
            "plan_type": plan_type,
            "status": "active",
            "start_date": "2024-01-01T00:00:00Z",
            "end_date": "2099-01-01T00:00:00Z",
            "price": 15000.0,
            "currency": "NGN",
            "payment_provider": "paystack",
            "payment_id": "ref_1",
            "auto_renew": true,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "error": {
                "message": message,
                "code": code
            }
        })
    }
}
