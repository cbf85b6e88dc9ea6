// libs/checkout-cell/src/services/checkout.rs
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};

use shared_database::{PersistenceProvider, UserScope};
use shared_models::auth::User;
use shared_utils::{InFlight, InFlightGuard};

use crate::models::{
    BasketItem, CheckoutError, CheckoutResult, Currency, DeliveryInfo, ModalOutcome, Order,
    PaymentHandoff, PaymentRequest, PaymentVerification,
};
use crate::services::basket::Basket;
use crate::services::paystack::{generate_reference, to_minor_units, PaymentProvider};

/// One user's basket plus the orders waiting on the payment modal, keyed by
/// payment reference.
#[derive(Debug, Default)]
pub struct CheckoutFlow {
    basket: Basket,
    currency: Currency,
    pending: HashMap<String, Order>,
}

impl CheckoutFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[BasketItem] {
        self.basket.items()
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn set_currency(&mut self, currency: Currency) {
        self.currency = currency;
    }

    pub fn pending_order(&self, reference: &str) -> Option<&Order> {
        self.pending.get(reference)
    }

    /// Oldest first.
    pub fn pending_references(&self) -> Vec<&str> {
        let mut orders: Vec<&Order> = self.pending.values().collect();
        orders.sort_by_key(|order| order.created_at);
        orders.into_iter().map(|order| order.payment_reference.as_str()).collect()
    }

    pub fn add_item(&mut self, item: BasketItem) -> Result<(), CheckoutError> {
        self.basket.add_item(item)
    }

    pub fn remove_item(&mut self, item_id: &str) {
        self.basket.remove_item(item_id)
    }

    pub fn set_quantity(&mut self, item_id: &str, quantity: i64) {
        self.basket.set_quantity(item_id, quantity)
    }

    pub fn compute_total(&self, currency: Currency) -> f64 {
        self.basket.compute_total(currency)
    }

    /// Initializes a payment for the whole basket in the selected currency and
    /// returns the parameters for the client-side modal. Nothing is persisted.
    pub async fn checkout(
        &mut self,
        payments: &dyn PaymentProvider,
        user: Option<&User>,
        delivery: DeliveryInfo,
    ) -> Result<PaymentHandoff, CheckoutError> {
        let user = user.ok_or(CheckoutError::NotAuthenticated)?;

        if self.basket.is_empty() {
            return Err(CheckoutError::EmptyBasket);
        }

        let missing = delivery.missing_fields();
        if !missing.is_empty() {
            return Err(CheckoutError::Validation(format!(
                "Please fill in all delivery details: {}",
                missing.join(", ")
            )));
        }

        let email = user
            .contact_email()
            .ok_or_else(|| CheckoutError::Validation("An email address is required for payment".to_string()))?
            .to_string();

        let currency = self.currency;
        let total = self.compute_total(currency);
        let reference = generate_reference();

        let request = PaymentRequest {
            email: email.clone(),
            amount: total,
            currency,
            metadata: json!({
                "user_id": user.id,
                "items": self.basket.items(),
                "delivery_info": delivery,
            }),
        };

        let initialization = payments.initialize_payment(&request, &reference).await?;

        if !self.pending.is_empty() {
            info!("User {} now has {} earlier checkouts awaiting payment", user.id, self.pending.len());
        }

        self.pending.insert(
            initialization.reference.clone(),
            Order::pending(
                &user.id,
                self.basket.items().to_vec(),
                total,
                currency,
                delivery,
                initialization.reference.clone(),
            ),
        );

        info!("Checkout {} started for user {}: {} {}", initialization.reference, user.id, total, currency);

        Ok(PaymentHandoff {
            public_key: payments.public_key().to_string(),
            email,
            amount: to_minor_units(total),
            currency,
            reference: initialization.reference,
            authorization_url: initialization.authorization_url,
            access_code: initialization.access_code,
        })
    }

    /// Resolves one pending checkout with the modal's outcome. A confirmed
    /// payment persists a completed order and takes the ordered items out of
    /// the basket; a closed modal leaves the basket untouched and records
    /// nothing. Other pending checkouts are unaffected.
    #[instrument(skip(self, payments, store, scope), fields(user_id = %scope.user_id))]
    pub async fn complete(
        &mut self,
        payments: &dyn PaymentProvider,
        store: &dyn PersistenceProvider,
        scope: &UserScope,
        reference: &str,
        outcome: ModalOutcome,
    ) -> Result<CheckoutResult, CheckoutError> {
        let pending = self
            .pending
            .get(reference)
            .filter(|order| order.user_id == scope.user_id)
            .ok_or_else(|| CheckoutError::UnknownReference(reference.to_string()))?;

        if outcome == ModalOutcome::Closed {
            info!("Payment modal closed for {}", reference);
            self.pending.remove(reference);
            return Ok(CheckoutResult::Cancelled);
        }

        let verification = payments.verify_payment(reference).await?;

        if !confirms(&verification, pending) {
            warn!(
                "Payment {} not confirmed: status {} amount {:?}",
                reference, verification.status, verification.amount
            );
            if let Some(mut order) = self.pending.remove(reference) {
                order.mark_failed()?;
            }
            return Err(CheckoutError::PaymentNotConfirmed(verification.status));
        }

        let mut order = pending.clone();
        order.mark_completed()?;

        store
            .insert(scope, "purchases", order.to_row())
            .await
            .map_err(|e| CheckoutError::Persistence(e.to_string()))?;

        self.pending.remove(reference);
        self.basket.remove_ordered(&order.items);

        info!("Order {} completed for user {}", reference, scope.user_id);
        Ok(CheckoutResult::Completed { order })
    }
}

fn confirms(verification: &PaymentVerification, order: &Order) -> bool {
    if !verification.is_success() {
        return false;
    }
    match verification.amount {
        Some(amount) => amount == to_minor_units(order.total),
        None => true,
    }
}

/// Per-user checkout flows. Checkout and completion are marked in flight so
/// a duplicate submission is refused while basket reads and edits wait.
#[derive(Default)]
pub struct CheckoutRegistry {
    flows: Mutex<HashMap<String, Arc<Mutex<CheckoutFlow>>>>,
    in_flight: InFlight,
}

impl CheckoutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    async fn flow_for(&self, user_id: &str) -> Arc<Mutex<CheckoutFlow>> {
        let mut flows = self.flows.lock().await;
        flows
            .entry(user_id.to_string())
            .or_insert_with(|| {
                debug!("Creating checkout flow for user {}", user_id);
                Arc::new(Mutex::new(CheckoutFlow::new()))
            })
            .clone()
    }

    /// Waits for the user's flow. Used for basket edits and reads.
    pub async fn acquire(&self, user_id: &str) -> OwnedMutexGuard<CheckoutFlow> {
        self.flow_for(user_id).await.lock_owned().await
    }

    /// Claims the flow for a checkout or completion. Fails fast while another
    /// one for the same user is in flight.
    pub async fn begin(
        &self,
        user_id: &str,
    ) -> Result<(InFlightGuard, OwnedMutexGuard<CheckoutFlow>), CheckoutError> {
        let guard = self
            .in_flight
            .begin(user_id)
            .ok_or(CheckoutError::AlreadyInProgress)?;
        let flow = self.acquire(user_id).await;
        Ok((guard, flow))
    }
}
