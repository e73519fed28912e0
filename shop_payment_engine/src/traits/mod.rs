//! The engine's external seams.
//!
//! [`ShopDatabase`] abstracts the order/product repository so the gates and APIs never care whether records live
//! in memory or in a shared store. [`PaymentProvider`] abstracts the payment processor's intent API.

mod payment_provider;
mod storage;

pub use payment_provider::{IntentMetadata, NewIntentRequest, PaymentIntent, PaymentProvider, ProviderError};
pub use storage::{ShopDatabase, StorageError};
