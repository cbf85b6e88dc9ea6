use std::sync::Arc;

use tracing::warn;

use checkout_cell::{PaymentProvider, PaystackClient};
use shared_config::AppConfig;
use shared_database::{PersistenceProvider, SupabaseClient, SupabaseStore};

use crate::services::{EntitlementService, SubscriptionService};

pub struct SubscriptionState {
    pub config: Arc<AppConfig>,
    pub entitlement: EntitlementService,
    pub subscriptions: SubscriptionService,
}

impl SubscriptionState {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let payments: Option<Arc<dyn PaymentProvider>> = match PaystackClient::new(&config) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                warn!("Subscriptions running without a payment provider: {}", e);
                None
            }
        };
        let store = Arc::new(SupabaseStore::new(Arc::new(SupabaseClient::new(&config))));

        Self::with_providers(config, payments, store)
    }

    pub fn with_providers(
        config: Arc<AppConfig>,
        payments: Option<Arc<dyn PaymentProvider>>,
        store: Arc<dyn PersistenceProvider>,
    ) -> Self {
        Self {
            config,
            entitlement: EntitlementService::new(store.clone()),
            subscriptions: SubscriptionService::new(payments, store),
        }
    }
}
