pub mod entitlement;
pub mod subscription;

pub use entitlement::EntitlementService;
pub use subscription::SubscriptionService;
