// libs/subscription-cell/src/services/subscription.rs
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use checkout_cell::models::{PaymentHandoff, PaymentVerification};
use checkout_cell::services::{generate_reference, to_minor_units, validate_reference};
use checkout_cell::{CheckoutError, Currency, PaymentProvider, PaymentRequest};
use shared_database::{PersistenceProvider, TableQuery, UserScope};
use shared_models::auth::User;

use crate::models::{plan_offer, PlanOffer, Subscription, SubscriptionError, SubscriptionTier};

/// Sells paid plans through the payment provider and records the resulting
/// subscription rows.
pub struct SubscriptionService {
    payments: Option<Arc<dyn PaymentProvider>>,
    store: Arc<dyn PersistenceProvider>,
}

impl SubscriptionService {
    pub fn new(payments: Option<Arc<dyn PaymentProvider>>, store: Arc<dyn PersistenceProvider>) -> Self {
        Self { payments, store }
    }

    fn payments(&self) -> Result<&dyn PaymentProvider, SubscriptionError> {
        self.payments
            .as_deref()
            .ok_or(SubscriptionError::Payment(CheckoutError::NotConfigured))
    }

    fn paid_plan(tier: SubscriptionTier) -> Result<PlanOffer, SubscriptionError> {
        if !tier.is_premium() {
            return Err(SubscriptionError::FreePlan);
        }
        plan_offer(tier).ok_or_else(|| SubscriptionError::UnknownPlan(tier.to_string()))
    }

    /// Initializes a payment for a paid plan and returns the modal parameters.
    pub async fn start_purchase(
        &self,
        user: &User,
        tier: SubscriptionTier,
        currency: Currency,
        metadata: Value,
    ) -> Result<PaymentHandoff, SubscriptionError> {
        let plan = Self::paid_plan(tier)?;
        let payments = self.payments()?;

        let email = user
            .contact_email()
            .ok_or_else(|| CheckoutError::Validation("An email address is required for payment".to_string()))?
            .to_string();

        let amount = plan.price(currency);
        let reference = generate_reference();
        let request = PaymentRequest {
            email: email.clone(),
            amount,
            currency,
            metadata: json!({
                "user_id": user.id,
                "plan_type": plan.id,
                "plan_name": plan.name,
                "extra": metadata,
            }),
        };

        let initialization = payments.initialize_payment(&request, &reference).await?;
        info!("Subscription payment {} started for user {} ({})", initialization.reference, user.id, tier);

        Ok(PaymentHandoff {
            public_key: payments.public_key().to_string(),
            email,
            amount: to_minor_units(amount),
            currency,
            reference: initialization.reference,
            authorization_url: initialization.authorization_url,
            access_code: initialization.access_code,
        })
    }

    /// Verifies the payment and records an active subscription for the plan.
    #[instrument(skip(self, scope), fields(user_id = %scope.user_id))]
    pub async fn complete_purchase(
        &self,
        scope: &UserScope,
        tier: SubscriptionTier,
        reference: &str,
    ) -> Result<Subscription, SubscriptionError> {
        let plan = Self::paid_plan(tier)?;
        validate_reference(reference)?;
        let payments = self.payments()?;

        let existing = self
            .store
            .select(scope, "subscriptions", TableQuery::new().eq("payment_id", reference).limit(1))
            .await
            .map_err(|e| SubscriptionError::Persistence(e.to_string()))?;
        if !existing.is_empty() {
            return Err(SubscriptionError::AlreadyApplied(reference.to_string()));
        }

        let verification = payments.verify_payment(reference).await?;
        if !made_for(&verification, scope, tier) {
            warn!(
                "Subscription payment {} belongs to user {:?} plan {:?}",
                reference,
                verification.metadata_str("user_id"),
                verification.metadata_str("plan_type")
            );
            return Err(SubscriptionError::PaymentMismatch(reference.to_string()));
        }

        let currency = paid_currency(&verification);
        if !pays_for(&verification, &plan, currency) {
            warn!(
                "Subscription payment {} not confirmed: status {} amount {:?}",
                reference, verification.status, verification.amount
            );
            return Err(CheckoutError::PaymentNotConfirmed(verification.status).into());
        }

        let subscription = Subscription::activate(&scope.user_id, &plan, currency, reference, Utc::now());
        let row = serde_json::to_value(&subscription)
            .map_err(|e| SubscriptionError::Persistence(e.to_string()))?;

        let stored = self
            .store
            .insert(scope, "subscriptions", row)
            .await
            .map_err(|e| SubscriptionError::Persistence(e.to_string()))?;

        info!("User {} subscribed to {} plan", scope.user_id, tier);
        Ok(Subscription {
            id: stored["id"].as_str().map(str::to_string),
            ..subscription
        })
    }
}

/// The transaction was initialized by `start_purchase` for this user and plan.
fn made_for(verification: &PaymentVerification, scope: &UserScope, tier: SubscriptionTier) -> bool {
    verification.metadata_str("user_id") == Some(scope.user_id.as_str())
        && verification.metadata_str("plan_type") == Some(tier.as_str())
}

fn paid_currency(verification: &PaymentVerification) -> Currency {
    match verification.currency.as_deref() {
        Some("USD") => Currency::Usd,
        _ => Currency::Ngn,
    }
}

fn pays_for(verification: &PaymentVerification, plan: &PlanOffer, currency: Currency) -> bool {
    verification.is_success()
        && verification
            .amount
            .is_none_or(|amount| amount == to_minor_units(plan.price(currency)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use checkout_cell::models::PaymentInitialization;
    use shared_utils::test_utils::{InMemoryStore, MockSupabaseResponses, TestUser};

    struct FixedPayments {
        status: &'static str,
        amount: Option<i64>,
        metadata: Value,
    }

    impl FixedPayments {
        fn paid(amount: Option<i64>, user: &TestUser, tier: SubscriptionTier) -> Self {
            Self {
                status: "success",
                amount,
                metadata: json!({ "user_id": user.id, "plan_type": tier.as_str() }),
            }
        }

        fn unverified() -> Self {
            Self { status: "success", amount: None, metadata: Value::Null }
        }
    }

    #[async_trait]
    impl PaymentProvider for FixedPayments {
        fn public_key(&self) -> &str {
            "pk_test_public"
        }

        async fn initialize_payment(
            &self,
            _request: &PaymentRequest,
            reference: &str,
        ) -> Result<PaymentInitialization, CheckoutError> {
            Ok(PaymentInitialization {
                reference: reference.to_string(),
                access_code: Some("code".to_string()),
                authorization_url: None,
            })
        }

        async fn verify_payment(&self, reference: &str) -> Result<PaymentVerification, CheckoutError> {
            Ok(PaymentVerification {
                reference: reference.to_string(),
                status: self.status.to_string(),
                amount: self.amount,
                currency: Some("NGN".to_string()),
                gateway_response: None,
                metadata: self.metadata.clone(),
            })
        }
    }

    fn service(payments: FixedPayments, store: &Arc<InMemoryStore>) -> SubscriptionService {
        SubscriptionService::new(Some(Arc::new(payments)), store.clone())
    }

    #[tokio::test]
    async fn free_plan_cannot_be_purchased() {
        let store = Arc::new(InMemoryStore::new());
        let svc = service(FixedPayments::unverified(), &store);
        let user = TestUser::default().to_user();

        assert_matches!(
            svc.start_purchase(&user, SubscriptionTier::Free, Currency::Ngn, Value::Null).await,
            Err(SubscriptionError::FreePlan)
        );
    }

    #[tokio::test]
    async fn purchase_hands_off_plan_price() {
        let store = Arc::new(InMemoryStore::new());
        let svc = service(FixedPayments::unverified(), &store);
        let user = TestUser::patient("sub@example.com").to_user();

        let handoff = svc
            .start_purchase(&user, SubscriptionTier::Monthly, Currency::Usd, Value::Null)
            .await
            .unwrap();

        assert_eq!(handoff.amount, 999);
        assert_eq!(handoff.currency, Currency::Usd);
        assert_eq!(handoff.email, "sub@example.com");
    }

    #[tokio::test]
    async fn confirmed_payment_records_active_subscription() {
        let store = Arc::new(InMemoryStore::new());
        let user = TestUser::default();
        let svc = service(FixedPayments::paid(Some(1_500_000), &user, SubscriptionTier::Monthly), &store);

        let subscription = svc
            .complete_purchase(&user.scope(), SubscriptionTier::Monthly, "ref_1_abcdefghi")
            .await
            .unwrap();

        assert!(subscription.id.is_some());
        let rows = store.rows("subscriptions");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["plan_type"], "monthly");
        assert_eq!(rows[0]["status"], "active");
        assert_eq!(rows[0]["payment_id"], "ref_1_abcdefghi");
        assert_eq!(rows[0]["user_id"], user.id.as_str());
    }

    #[tokio::test]
    async fn underpaid_reference_records_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let user = TestUser::default();
        let svc = service(FixedPayments::paid(Some(100), &user, SubscriptionTier::Yearly), &store);

        let result = svc
            .complete_purchase(&user.scope(), SubscriptionTier::Yearly, "ref_2_abcdefghi")
            .await;

        assert_matches!(result, Err(SubscriptionError::Payment(CheckoutError::PaymentNotConfirmed(_))));
        assert!(store.rows("subscriptions").is_empty());
    }

    #[tokio::test]
    async fn reference_cannot_be_applied_twice() {
        let store = Arc::new(InMemoryStore::new());
        let user = TestUser::default();
        let mut existing = MockSupabaseResponses::subscription_response(&user.id, "monthly");
        existing["payment_id"] = serde_json::json!("ref_3_abcdefghi");
        store.seed("subscriptions", existing);
        let svc = service(FixedPayments::paid(None, &user, SubscriptionTier::Monthly), &store);

        let result = svc
            .complete_purchase(&user.scope(), SubscriptionTier::Monthly, "ref_3_abcdefghi")
            .await;

        assert_matches!(result, Err(SubscriptionError::AlreadyApplied(_)));
        assert_eq!(store.rows("subscriptions").len(), 1);
    }

    #[tokio::test]
    async fn another_users_payment_cannot_activate_a_plan() {
        let store = Arc::new(InMemoryStore::new());
        let alice = TestUser::default();
        let bob = TestUser::default();
        let svc = service(FixedPayments::paid(None, &alice, SubscriptionTier::Monthly), &store);

        assert!(svc
            .complete_purchase(&alice.scope(), SubscriptionTier::Monthly, "ref_9_abcdefghi")
            .await
            .is_ok());
        let replay = svc
            .complete_purchase(&bob.scope(), SubscriptionTier::Monthly, "ref_9_abcdefghi")
            .await;

        assert_matches!(replay, Err(SubscriptionError::PaymentMismatch(reference)) if reference == "ref_9_abcdefghi");
        let rows = store.rows("subscriptions");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["user_id"], alice.id.as_str());
    }

    #[tokio::test]
    async fn payment_for_another_plan_or_a_checkout_is_refused() {
        let store = Arc::new(InMemoryStore::new());
        let user = TestUser::default();

        let monthly = service(FixedPayments::paid(None, &user, SubscriptionTier::Monthly), &store);
        assert_matches!(
            monthly.complete_purchase(&user.scope(), SubscriptionTier::Yearly, "ref_5_abcdefghi").await,
            Err(SubscriptionError::PaymentMismatch(_))
        );

        let checkout = FixedPayments {
            metadata: json!({ "user_id": user.id, "items": [] }),
            ..FixedPayments::unverified()
        };
        assert_matches!(
            service(checkout, &store)
                .complete_purchase(&user.scope(), SubscriptionTier::Monthly, "ref_6_abcdefghi")
                .await,
            Err(SubscriptionError::PaymentMismatch(_))
        );
        assert!(store.rows("subscriptions").is_empty());
    }

    #[tokio::test]
    async fn missing_provider_is_not_configured() {
        let store = Arc::new(InMemoryStore::new());
        let svc = SubscriptionService::new(None, store);
        let user = TestUser::default().to_user();

        assert_matches!(
            svc.start_purchase(&user, SubscriptionTier::Yearly, Currency::Ngn, Value::Null).await,
            Err(SubscriptionError::Payment(CheckoutError::NotConfigured))
        );
    }
}
