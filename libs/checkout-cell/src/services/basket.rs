use crate::models::{BasketItem, CheckoutError, Currency};

/// Ordered item list keyed by item id. Quantities are always at least one.
#[derive(Debug, Clone, Default)]
pub struct Basket {
    items: Vec<BasketItem>,
}

impl Basket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[BasketItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Adds the item or bumps the quantity of the existing entry with the same id.
    pub fn add_item(&mut self, item: BasketItem) -> Result<(), CheckoutError> {
        if item.id.trim().is_empty() {
            return Err(CheckoutError::Validation("Item id is required".to_string()));
        }
        if item.price_ngn < 0.0 || item.price_usd < 0.0 {
            return Err(CheckoutError::Validation("Item prices cannot be negative".to_string()));
        }

        let quantity = item.quantity.max(1);
        match self.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => existing.quantity += quantity,
            None => self.items.push(BasketItem { quantity, ..item }),
        }
        Ok(())
    }

    /// Removing an id that is not present is a no-op.
    pub fn remove_item(&mut self, item_id: &str) {
        self.items.retain(|item| item.id != item_id);
    }

    /// A quantity of zero or less removes the item.
    pub fn set_quantity(&mut self, item_id: &str, quantity: i64) {
        if quantity <= 0 {
            self.remove_item(item_id);
            return;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        if let Some(item) = self.items.iter_mut().find(|item| item.id == item_id) {
            item.quantity = quantity;
        }
    }

    pub fn compute_total(&self, currency: Currency) -> f64 {
        self.items
            .iter()
            .map(|item| item.price(currency) * f64::from(item.quantity))
            .sum()
    }

    /// Takes paid-for quantities out of the basket. Items added or topped up
    /// after the order was placed stay behind.
    pub fn remove_ordered(&mut self, ordered: &[BasketItem]) {
        for paid in ordered {
            if let Some(item) = self.items.iter_mut().find(|item| item.id == paid.id) {
                item.quantity = item.quantity.saturating_sub(paid.quantity);
            }
        }
        self.items.retain(|item| item.quantity > 0);
    }
}
