// libs/checkout-cell/src/lib.rs
//! # Checkout Cell
//!
//! Basket management and card checkout through Paystack. Completed orders are
//! written to the `purchases` table.
//!
//! ```text
//! +-----------------------------------------------------+
//! |                  Checkout Cell                      |
//! +-----------------------------------------------------+
//! |  handlers.rs    |  HTTP endpoint handlers           |
//! |  router.rs      |  Route definitions                |
//! |  models.rs      |  Basket, order & payment DTOs     |
//! |  state.rs       |  Providers and per-user flows     |
//! |  services/      |  Business logic layer             |
//! |    basket.rs    |  Item list and totals             |
//! |    checkout.rs  |  Checkout flow and registry       |
//! |    paystack.rs  |  Paystack API client              |
//! +-----------------------------------------------------+
//! ```
//!
//! A checkout hands the client everything it needs to open the payment modal.
//! The modal's outcome is posted back to `/checkout/complete`; only a payment
//! the provider confirms produces an order.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod state;

pub use models::{CheckoutError, Currency, PaymentHandoff, PaymentRequest};
pub use router::{checkout_routes, checkout_routes_with_state, payment_routes, payment_routes_with_state};
pub use services::{PaymentProvider, PaystackClient};
pub use state::CheckoutState;
