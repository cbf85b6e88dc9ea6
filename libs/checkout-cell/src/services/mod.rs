pub mod basket;
pub mod checkout;
pub mod paystack;

pub use basket::Basket;
pub use checkout::{CheckoutFlow, CheckoutRegistry};
pub use paystack::{generate_reference, to_minor_units, validate_reference, PaymentProvider, PaystackClient};
