use thiserror::Error;
use tsg_common::MinorUnits;

use crate::db_types::OrderId;

/// Opaque correlation data attached to a provider-side intent. It comes back on webhook events and in the
/// provider's dashboard, so keep it to identifiers and display names.
#[derive(Debug, Clone)]
pub struct IntentMetadata {
    pub order_id: OrderId,
    pub buyer_id: String,
    pub product_id: String,
    pub product_name: String,
}

#[derive(Debug, Clone)]
pub struct NewIntentRequest {
    pub amount: MinorUnits,
    pub currency: String,
    pub metadata: IntentMetadata,
}

/// A provider-side charge attempt: the `reference` is what webhook events are keyed on, the `client_secret`
/// is handed to the buyer-facing checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub reference: String,
    pub client_secret: String,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("The payment provider request failed. {0}")]
    RequestFailed(String),
    #[error("The payment provider returned an unexpected response. {0}")]
    UnexpectedResponse(String),
}

#[allow(async_fn_in_trait)]
pub trait PaymentProvider {
    /// Create a new payment intent on the provider.
    async fn create_intent(&self, request: NewIntentRequest) -> Result<PaymentIntent, ProviderError>;

    /// Fetch an existing intent by its reference.
    async fn retrieve_intent(&self, reference: &str) -> Result<PaymentIntent, ProviderError>;

    /// The smallest amount the provider will charge in the given currency.
    fn minimum_charge(&self, currency: &str) -> MinorUnits;
}
