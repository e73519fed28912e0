//! The payment intent orchestrator: creates (or re-uses) a provider-side payment intent per order, enforcing
//! the payable-state and price-floor rules before any money can move.

mod api;
mod errors;

pub use api::{CheckoutIntent, NewCheckout, PaymentIntentApi};
pub use errors::PaymentIntentError;
