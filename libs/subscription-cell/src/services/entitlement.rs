// libs/subscription-cell/src/services/entitlement.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use shared_database::{PersistenceProvider, TableQuery, UserScope};

use crate::models::{SubscriptionError, SubscriptionTier};

/// Resolves which plan a user is entitled to. Every call reads through to
/// the store; gated actions call it each time they run.
#[derive(Clone)]
pub struct EntitlementService {
    store: Arc<dyn PersistenceProvider>,
}

impl EntitlementService {
    pub fn new(store: Arc<dyn PersistenceProvider>) -> Self {
        Self { store }
    }

    /// Plan of the newest active, unexpired subscription with a recognised
    /// plan type; `Free` when there is none or the lookup fails.
    pub async fn check(&self, scope: &UserScope) -> SubscriptionTier {
        let query = TableQuery::new()
            .eq("status", "active")
            .order_desc("created_at");

        let rows = match self.store.select(scope, "subscriptions", query).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Entitlement lookup failed for user {}, assuming free: {}", scope.user_id, e);
                return SubscriptionTier::Free;
            }
        };

        let now = Utc::now();
        let tier = rows
            .iter()
            .filter(|row| !has_expired(row, now))
            .find_map(|row| row["plan_type"].as_str().and_then(|plan| plan.parse().ok()))
            .unwrap_or_default();

        debug!("User {} entitled to {} plan", scope.user_id, tier);
        tier
    }

    /// The newest active subscription row, if any.
    pub async fn current_subscription(&self, scope: &UserScope) -> Result<Option<Value>, SubscriptionError> {
        let query = TableQuery::new()
            .eq("status", "active")
            .order_desc("created_at")
            .limit(1);

        let rows = self
            .store
            .select(scope, "subscriptions", query)
            .await
            .map_err(|e| SubscriptionError::Persistence(e.to_string()))?;
        Ok(rows.into_iter().next())
    }
}

fn has_expired(row: &Value, now: DateTime<Utc>) -> bool {
    row["end_date"]
        .as_str()
        .and_then(|end| DateTime::parse_from_rfc3339(end).ok())
        .is_some_and(|end| end.with_timezone(&Utc) < now)
}
