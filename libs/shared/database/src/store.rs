use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Method,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::supabase::SupabaseClient;

/// Identity every persistence call runs under. The user id is applied as a
/// row filter on reads and updates and stamped on inserts.
#[derive(Debug, Clone)]
pub struct UserScope {
    pub user_id: String,
    pub auth_token: String,
}

impl UserScope {
    pub fn new(user_id: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            auth_token: auth_token.into(),
        }
    }
}

/// Equality filters, ordering and limit for a table read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableQuery {
    pub filters: Vec<(String, String)>,
    pub order: Option<(String, bool)>,
    pub limit: Option<usize>,
}

impl TableQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push((column.to_string(), value.to_string()));
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order = Some((column.to_string(), false));
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.order = Some((column.to_string(), true));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// PostgREST query string, always led by the scope's `user_id` filter.
    pub fn to_query_string(&self, scope: &UserScope) -> String {
        let mut parts = vec![format!("user_id=eq.{}", urlencoding::encode(&scope.user_id))];

        for (column, value) in &self.filters {
            if column == "user_id" {
                continue;
            }
            parts.push(format!("{}=eq.{}", column, urlencoding::encode(value)));
        }

        if let Some((column, ascending)) = &self.order {
            parts.push(format!("order={}.{}", column, if *ascending { "asc" } else { "desc" }));
        }

        if let Some(limit) = self.limit {
            parts.push(format!("limit={}", limit));
        }

        parts.join("&")
    }
}

/// Table-style storage keyed by user.
#[async_trait]
pub trait PersistenceProvider: Send + Sync {
    async fn select(&self, scope: &UserScope, table: &str, query: TableQuery) -> Result<Vec<Value>>;

    async fn insert(&self, scope: &UserScope, table: &str, row: Value) -> Result<Value>;

    async fn update(&self, scope: &UserScope, table: &str, query: TableQuery, patch: Value) -> Result<Vec<Value>>;

    async fn rpc(&self, scope: &UserScope, function: &str, args: Value) -> Result<Value>;
}

/// Stamps the scope's user id onto an object row, replacing any caller value.
pub fn scoped_row(scope: &UserScope, row: Value) -> Result<Value> {
    let mut object: Map<String, Value> = match row {
        Value::Object(map) => map,
        other => return Err(anyhow!("Row must be a JSON object, got {}", other)),
    };
    object.insert("user_id".to_string(), Value::String(scope.user_id.clone()));
    Ok(Value::Object(object))
}

/// Removes `user_id` from a patch so rows can never be moved between users.
fn scoped_patch(patch: Value) -> Result<Value> {
    match patch {
        Value::Object(mut map) => {
            map.remove("user_id");
            Ok(Value::Object(map))
        }
        other => Err(anyhow!("Patch must be a JSON object, got {}", other)),
    }
}

fn representation_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}

pub struct SupabaseStore {
    client: Arc<SupabaseClient>,
}

impl SupabaseStore {
    pub fn new(client: Arc<SupabaseClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PersistenceProvider for SupabaseStore {
    async fn select(&self, scope: &UserScope, table: &str, query: TableQuery) -> Result<Vec<Value>> {
        let path = format!("/rest/v1/{}?select=*&{}", table, query.to_query_string(scope));
        debug!("Selecting from {} for user {}", table, scope.user_id);

        self.client.request(Method::GET, &path, Some(&scope.auth_token), None).await
    }

    async fn insert(&self, scope: &UserScope, table: &str, row: Value) -> Result<Value> {
        let row = scoped_row(scope, row)?;
        let path = format!("/rest/v1/{}", table);
        debug!("Inserting into {} for user {}", table, scope.user_id);

        let result: Vec<Value> = self.client.request_with_headers(
            Method::POST,
            &path,
            Some(&scope.auth_token),
            Some(row),
            Some(representation_headers()),
        ).await?;

        result.into_iter()
            .next()
            .ok_or_else(|| anyhow!("Insert into {} returned no rows", table))
    }

    async fn update(&self, scope: &UserScope, table: &str, query: TableQuery, patch: Value) -> Result<Vec<Value>> {
        let patch = scoped_patch(patch)?;
        let path = format!("/rest/v1/{}?{}", table, query.to_query_string(scope));
        debug!("Updating {} for user {}", table, scope.user_id);

        self.client.request_with_headers(
            Method::PATCH,
            &path,
            Some(&scope.auth_token),
            Some(patch),
            Some(representation_headers()),
        ).await
    }

    async fn rpc(&self, scope: &UserScope, function: &str, args: Value) -> Result<Value> {
        let path = format!("/rest/v1/rpc/{}", function);
        debug!("Calling rpc {} for user {}", function, scope.user_id);

        self.client.request(Method::POST, &path, Some(&scope.auth_token), Some(args)).await
    }
}
