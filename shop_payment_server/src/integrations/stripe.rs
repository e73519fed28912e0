//! The Stripe payment intent client.
//!
//! Talks to the Stripe REST API with the account's secret key. Only the two payment intent calls the
//! orchestrator needs are implemented.

use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
};
use serde::Deserialize;
use shop_payment_engine::traits::{NewIntentRequest, PaymentIntent, PaymentProvider, ProviderError};
use tsg_common::MinorUnits;

use crate::{config::StripeConfig, errors::ServerError};

/// Stripe refuses charges below 50 minor units in USD-like currencies.
pub const MINIMUM_CHARGE_MINOR_UNITS: i64 = 50;

#[derive(Clone)]
pub struct StripeApi {
    client: Arc<Client>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: String,
    client_secret: String,
}

impl StripeApi {
    pub fn new(config: &StripeConfig) -> Result<Self, ServerError> {
        let mut headers = HeaderMap::with_capacity(1);
        let bearer = format!("Bearer {}", config.secret_key.reveal());
        let mut val =
            HeaderValue::from_str(&bearer).map_err(|e| ServerError::InitializeError(e.to_string()))?;
        val.set_sensitive(true);
        headers.insert(AUTHORIZATION, val);
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ServerError::InitializeError(e.to_string()))?;
        Ok(Self { client: Arc::new(client), base_url: config.api_url.clone() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.base_url)
    }
}

impl PaymentProvider for StripeApi {
    async fn create_intent(&self, request: NewIntentRequest) -> Result<PaymentIntent, ProviderError> {
        let amount = request.amount.value().to_string();
        let metadata = request.metadata;
        // The Stripe API is form-encoded, with nested fields in bracket notation
        let params = [
            ("amount", amount.as_str()),
            ("currency", request.currency.as_str()),
            ("automatic_payment_methods[enabled]", "true"),
            ("metadata[order_id]", metadata.order_id.as_str()),
            ("metadata[buyer_id]", metadata.buyer_id.as_str()),
            ("metadata[product_id]", metadata.product_id.as_str()),
            ("metadata[product_name]", metadata.product_name.as_str()),
        ];
        trace!("💳️ Creating payment intent for order {}", metadata.order_id);
        let response = self
            .client
            .post(self.url("/payment_intents"))
            .form(&params)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        let intent = parse_intent_response(response).await?;
        debug!("💳️ Created payment intent {} for order {}", intent.reference, metadata.order_id);
        Ok(intent)
    }

    async fn retrieve_intent(&self, reference: &str) -> Result<PaymentIntent, ProviderError> {
        trace!("💳️ Retrieving payment intent {reference}");
        let response = self
            .client
            .get(self.url(&format!("/payment_intents/{reference}")))
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        parse_intent_response(response).await
    }

    fn minimum_charge(&self, _currency: &str) -> MinorUnits {
        MinorUnits::from(MINIMUM_CHARGE_MINOR_UNITS)
    }
}

async fn parse_intent_response(response: reqwest::Response) -> Result<PaymentIntent, ProviderError> {
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        return Err(ProviderError::UnexpectedResponse(format!("Status {status}: {message}")));
    }
    let intent =
        response.json::<IntentResponse>().await.map_err(|e| ProviderError::UnexpectedResponse(e.to_string()))?;
    Ok(PaymentIntent { reference: intent.id, client_secret: intent.client_secret })
}
