// libs/subscription-cell/src/lib.rs
//! # Subscription Cell
//!
//! Plan catalogue, paid plan purchase and the entitlement check other cells
//! gate premium features on.
//!
//! ```text
//! +-----------------------------------------------------+
//! |                Subscription Cell                    |
//! +-----------------------------------------------------+
//! |  handlers.rs     |  HTTP endpoint handlers          |
//! |  router.rs       |  Route definitions               |
//! |  models.rs       |  Tiers, plans, subscription rows |
//! |  services/       |                                  |
//! |    entitlement.rs|  Current plan lookup             |
//! |    subscription.rs| Plan purchase via Paystack      |
//! +-----------------------------------------------------+
//! ```
//!
//! ## API Endpoints
//! - `GET /subscriptions/plans` - Plan catalogue
//! - `GET /subscriptions/current` - Caller's plan
//! - `POST /subscriptions` - Start a paid plan purchase
//! - `POST /subscriptions/complete` - Record a confirmed purchase

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod state;

pub use models::{SubscriptionError, SubscriptionTier};
pub use router::{subscription_routes, subscription_routes_with_state};
pub use services::EntitlementService;
pub use state::SubscriptionState;
