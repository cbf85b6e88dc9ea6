use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ==============================================================================
// BASKET & ORDER DOMAIN MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Currency {
    #[default]
    #[serde(rename = "NGN")]
    Ngn,
    #[serde(rename = "USD")]
    Usd,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Ngn => "NGN",
            Currency::Usd => "USD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

fn default_quantity() -> u32 {
    1
}

/// A product the user intends to buy. Prices are major-unit decimals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BasketItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub price_ngn: f64,
    pub price_usd: f64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

impl BasketItem {
    pub fn price(&self, currency: Currency) -> f64 {
        match currency {
            Currency::Ngn => self.price_ngn,
            Currency::Usd => self.price_usd,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryInfo {
    pub address: String,
    pub phone: String,
    pub receiver_name: String,
}

impl DeliveryInfo {
    /// Names of the fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.address.trim().is_empty() {
            missing.push("address");
        }
        if self.phone.trim().is_empty() {
            missing.push("phone");
        }
        if self.receiver_name.trim().is_empty() {
            missing.push("receiverName");
        }
        missing
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "failed")]
    Failed,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => f.write_str("pending"),
            PaymentStatus::Completed => f.write_str("completed"),
            PaymentStatus::Failed => f.write_str("failed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub user_id: String,
    pub items: Vec<BasketItem>,
    pub total: f64,
    pub currency: Currency,
    pub delivery: DeliveryInfo,
    pub payment_reference: String,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn pending(
        user_id: &str,
        items: Vec<BasketItem>,
        total: f64,
        currency: Currency,
        delivery: DeliveryInfo,
        payment_reference: String,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            items,
            total,
            currency,
            delivery,
            payment_reference,
            payment_status: PaymentStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn mark_completed(&mut self) -> Result<(), CheckoutError> {
        self.transition(PaymentStatus::Completed)
    }

    pub fn mark_failed(&mut self) -> Result<(), CheckoutError> {
        self.transition(PaymentStatus::Failed)
    }

    fn transition(&mut self, to: PaymentStatus) -> Result<(), CheckoutError> {
        if self.payment_status != PaymentStatus::Pending {
            return Err(CheckoutError::InvalidStatusTransition {
                from: self.payment_status,
                to,
            });
        }
        self.payment_status = to;
        Ok(())
    }

    /// Row shape of the `purchases` table.
    pub fn to_row(&self) -> Value {
        json!({
            "user_id": self.user_id,
            "items": self.items,
            "total_price_ngn": if self.currency == Currency::Ngn { Some(self.total) } else { None },
            "total_price_usd": if self.currency == Currency::Usd { Some(self.total) } else { None },
            "currency": self.currency,
            "payment_provider": "paystack",
            "payment_status": self.payment_status,
            "payment_info": { "reference": self.payment_reference },
            "delivery_address": self.delivery,
            "receiver_name": self.delivery.receiver_name,
            "phone_number": self.delivery.phone,
        })
    }
}

// ==============================================================================
// PAYMENT PROVIDER DTOs
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub email: String,
    /// Major units; converted to minor units at the provider boundary.
    pub amount: f64,
    pub currency: Currency,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentInitialization {
    pub reference: String,
    pub access_code: Option<String>,
    pub authorization_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentVerification {
    pub reference: String,
    pub status: String,
    /// Minor units as reported by the provider.
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub gateway_response: Option<String>,
    /// Metadata attached when the transaction was initialized.
    #[serde(default)]
    pub metadata: Value,
}

impl PaymentVerification {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// String value stored under `key` in the transaction metadata.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

/// Everything the client-side payment modal needs to open.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentHandoff {
    pub public_key: String,
    pub email: String,
    pub amount: i64,
    pub currency: Currency,
    pub reference: String,
    pub authorization_url: Option<String>,
    pub access_code: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ModalOutcome {
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "closed")]
    Closed,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckoutResult {
    Completed { order: Order },
    Cancelled,
}

// ==============================================================================
// REQUEST DTOs
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct SetCurrencyRequest {
    pub currency: Currency,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub delivery_info: DeliveryInfo,
    pub currency: Option<Currency>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteCheckoutRequest {
    pub reference: String,
    pub outcome: ModalOutcome,
}

#[derive(Debug, Deserialize)]
pub struct InitializePaymentRequest {
    pub email: Option<String>,
    pub amount: f64,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Debug, Deserialize)]
pub struct BasketQuery {
    pub currency: Option<Currency>,
}

// ==============================================================================
// ERROR HANDLING
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("Payment service not configured")]
    NotConfigured,

    #[error("Please log in to continue")]
    NotAuthenticated,

    #[error("Your basket is empty")]
    EmptyBasket,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("A checkout is already in progress")]
    AlreadyInProgress,

    #[error("No pending checkout for reference {0}")]
    UnknownReference(String),

    #[error("Payment was not confirmed: {0}")]
    PaymentNotConfirmed(String),

    #[error("Invalid payment status transition from {from} to {to}")]
    InvalidStatusTransition { from: PaymentStatus, to: PaymentStatus },

    #[error("Payment provider error: {message}")]
    Provider { message: String },

    #[error("Database error: {0}")]
    Persistence(String),
}

impl From<reqwest::Error> for CheckoutError {
    fn from(err: reqwest::Error) -> Self {
        CheckoutError::Provider {
            message: err.to_string(),
        }
    }
}

impl From<CheckoutError> for shared_models::error::AppError {
    fn from(err: CheckoutError) -> Self {
        use shared_models::error::AppError;
        match err {
            CheckoutError::NotConfigured => AppError::Configuration(err.to_string()),
            CheckoutError::NotAuthenticated => AppError::Auth(err.to_string()),
            CheckoutError::EmptyBasket | CheckoutError::Validation(_) => {
                AppError::ValidationError(err.to_string())
            }
            CheckoutError::AlreadyInProgress | CheckoutError::InvalidStatusTransition { .. } => {
                AppError::Conflict(err.to_string())
            }
            CheckoutError::UnknownReference(_) => AppError::NotFound(err.to_string()),
            CheckoutError::PaymentNotConfirmed(_) => AppError::BadRequest(err.to_string()),
            CheckoutError::Provider { .. } => AppError::ExternalService(err.to_string()),
            CheckoutError::Persistence(_) => AppError::Database(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn order() -> Order {
        Order::pending("u1", vec![], 0.0, Currency::Ngn, DeliveryInfo::default(), "ref_1".into())
    }

    #[test]
    fn order_status_moves_forward_only() {
        let mut completed = order();
        completed.mark_completed().unwrap();
        assert_eq!(completed.payment_status, PaymentStatus::Completed);
        assert_matches!(completed.mark_failed(), Err(CheckoutError::InvalidStatusTransition { .. }));
        assert_matches!(completed.mark_completed(), Err(CheckoutError::InvalidStatusTransition { .. }));

        let mut failed = order();
        failed.mark_failed().unwrap();
        assert_matches!(failed.mark_completed(), Err(CheckoutError::InvalidStatusTransition { .. }));
    }

    #[test]
    fn purchase_row_fills_only_chosen_currency_total() {
        let mut order = order();
        order.total = 25.5;
        order.currency = Currency::Usd;
        let row = order.to_row();

        assert!(row["total_price_ngn"].is_null());
        assert_eq!(row["total_price_usd"], 25.5);
        assert_eq!(row["currency"], "USD");
        assert_eq!(row["payment_info"]["reference"], "ref_1");
    }

    #[test]
    fn delivery_info_reports_blank_fields() {
        let info = DeliveryInfo {
            address: "12 Marina".into(),
            phone: "  ".into(),
            receiver_name: String::new(),
        };
        assert_eq!(info.missing_fields(), vec!["phone", "receiverName"]);
    }

    #[test]
    fn basket_item_quantity_defaults_to_one() {
        let item: BasketItem = serde_json::from_value(json!({
            "id": "a", "name": "Zinc", "price_ngn": 1000.0, "price_usd": 1.5
        }))
        .unwrap();
        assert_eq!(item.quantity, 1);
        assert_eq!(item.price(Currency::Usd), 1.5);
    }
}
