use std::sync::Arc;

use tracing::warn;

use shared_config::AppConfig;
use shared_database::{PersistenceProvider, SupabaseClient, SupabaseStore};

use crate::models::CheckoutError;
use crate::services::{CheckoutRegistry, PaymentProvider, PaystackClient};

/// Shared state behind the checkout and payment routes.
pub struct CheckoutState {
    pub config: Arc<AppConfig>,
    pub payments: Option<Arc<dyn PaymentProvider>>,
    pub store: Arc<dyn PersistenceProvider>,
    pub registry: CheckoutRegistry,
}

impl CheckoutState {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let payments: Option<Arc<dyn PaymentProvider>> = match PaystackClient::new(&config) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                warn!("Checkout running without a payment provider: {}", e);
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
            payments,
            store,
            registry: CheckoutRegistry::new(),
        }
    }

    pub fn payments(&self) -> Result<&dyn PaymentProvider, CheckoutError> {
        self.payments.as_deref().ok_or(CheckoutError::NotConfigured)
    }
}
