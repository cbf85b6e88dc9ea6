use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use checkout_cell::{CheckoutError, Currency};

// ==============================================================================
// PLAN & TIER MODELS
// ==============================================================================

/// Subscription plan a user is entitled to. Doubles as the `plan_type` column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Monthly,
    Yearly,
}

impl SubscriptionTier {
    pub fn is_premium(&self) -> bool {
        !matches!(self, SubscriptionTier::Free)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Monthly => "monthly",
            SubscriptionTier::Yearly => "yearly",
        }
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionTier {
    type Err = SubscriptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(SubscriptionTier::Free),
            "monthly" => Ok(SubscriptionTier::Monthly),
            "yearly" => Ok(SubscriptionTier::Yearly),
            other => Err(SubscriptionError::UnknownPlan(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlanOffer {
    pub id: SubscriptionTier,
    pub name: &'static str,
    pub price_ngn: f64,
    pub price_usd: f64,
    pub period: &'static str,
    pub duration_days: i64,
    pub features: Vec<&'static str>,
}

impl PlanOffer {
    pub fn price(&self, currency: Currency) -> f64 {
        match currency {
            Currency::Ngn => self.price_ngn,
            Currency::Usd => self.price_usd,
        }
    }
}

pub fn plan_catalogue() -> Vec<PlanOffer> {
    vec![
        PlanOffer {
            id: SubscriptionTier::Free,
            name: "Free",
            price_ngn: 0.0,
            price_usd: 0.0,
            period: "forever",
            duration_days: 0,
            features: vec![
                "General Physician consultations",
                "Basic health articles",
                "Symptom checker",
            ],
        },
        PlanOffer {
            id: SubscriptionTier::Monthly,
            name: "Monthly",
            price_ngn: 15000.0,
            price_usd: 9.99,
            period: "month",
            duration_days: 30,
            features: vec![
                "All specialist doctors",
                "Unlimited consultations",
                "Personalised treatment plans",
                "Priority support",
            ],
        },
        PlanOffer {
            id: SubscriptionTier::Yearly,
            name: "Yearly",
            price_ngn: 150000.0,
            price_usd: 99.99,
            period: "year",
            duration_days: 365,
            features: vec![
                "Everything in Monthly",
                "Two months free",
                "Family health records",
            ],
        },
    ]
}

pub fn plan_offer(tier: SubscriptionTier) -> Option<PlanOffer> {
    plan_catalogue().into_iter().find(|plan| plan.id == tier)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Expired,
}

/// A row of the `subscriptions` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subscription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    pub plan_type: SubscriptionTier,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub price: f64,
    pub currency: Currency,
    pub payment_provider: String,
    pub payment_id: String,
    #[serde(default)]
    pub auto_renew: bool,
}

impl Subscription {
    pub fn activate(
        user_id: &str,
        plan: &PlanOffer,
        currency: Currency,
        payment_id: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            user_id: user_id.to_string(),
            plan_type: plan.id,
            status: SubscriptionStatus::Active,
            start_date: now,
            end_date: now + chrono::Duration::days(plan.duration_days),
            price: plan.price(currency),
            currency,
            payment_provider: "paystack".to_string(),
            payment_id: payment_id.to_string(),
            auto_renew: true,
        }
    }
}

// ==============================================================================
// REQUEST DTOs
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub plan_type: SubscriptionTier,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Debug, Deserialize)]
pub struct CompleteSubscriptionRequest {
    pub plan_type: SubscriptionTier,
    pub reference: String,
}

// ==============================================================================
// ERROR HANDLING
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    #[error("Unknown plan: {0}")]
    UnknownPlan(String),

    #[error("The free plan does not require payment")]
    FreePlan,

    #[error("Payment reference {0} was already used")]
    AlreadyApplied(String),

    #[error("Payment {0} was not made for this account and plan")]
    PaymentMismatch(String),

    #[error(transparent)]
    Payment(#[from] CheckoutError),

    #[error("Database error: {0}")]
    Persistence(String),
}

impl From<SubscriptionError> for shared_models::error::AppError {
    fn from(err: SubscriptionError) -> Self {
        use shared_models::error::AppError;
        match err {
            SubscriptionError::UnknownPlan(_) | SubscriptionError::FreePlan => {
                AppError::ValidationError(err.to_string())
            }
            SubscriptionError::AlreadyApplied(_) => AppError::Conflict(err.to_string()),
            SubscriptionError::PaymentMismatch(_) => AppError::Forbidden(err.to_string()),
            SubscriptionError::Payment(inner) => inner.into(),
            SubscriptionError::Persistence(_) => AppError::Database(err.to_string()),
        }
    }
}
