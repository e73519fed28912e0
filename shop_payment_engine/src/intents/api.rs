use std::fmt::Debug;

use log::*;
use rust_decimal::Decimal;
use tsg_common::MinorUnits;

use crate::{
    db_types::{InteractionKind, NewInteraction, NewOrder, Order, OrderId, OrderStatus, Product},
    intents::PaymentIntentError,
    traits::{IntentMetadata, NewIntentRequest, PaymentIntent, PaymentProvider, ShopDatabase},
};

/// An order together with the provider intent that pays for it.
#[derive(Debug, Clone)]
pub struct CheckoutIntent {
    pub order: Order,
    pub intent: PaymentIntent,
}

/// The result of a purchase initiated from the conversational channel: the product that was bought, the freshly
/// created order, and its intent.
#[derive(Debug, Clone)]
pub struct NewCheckout {
    pub product: Product,
    pub order: Order,
    pub intent: PaymentIntent,
}

pub struct PaymentIntentApi<B, P> {
    db: B,
    provider: P,
}

impl<B, P> Debug for PaymentIntentApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentIntentApi")
    }
}

impl<B, P> PaymentIntentApi<B, P> {
    pub fn new(db: B, provider: P) -> Self {
        Self { db, provider }
    }
}

impl<B, P> PaymentIntentApi<B, P>
where
    B: ShopDatabase,
    P: PaymentProvider,
{
    /// Create a payment intent for the order, or return the one it already has.
    ///
    /// Re-using the existing intent makes repeated checkout attempts idempotent: an order is linked to at most
    /// one provider intent for its whole life. Only `pending` orders are payable.
    pub async fn create_or_get_intent(&self, order_id: &OrderId) -> Result<CheckoutIntent, PaymentIntentError> {
        let order =
            self.db.fetch_order(order_id).await?.ok_or_else(|| PaymentIntentError::OrderNotFound(order_id.clone()))?;
        if order.status != OrderStatus::Pending {
            return Err(PaymentIntentError::OrderNotPayable(order.id));
        }
        if let Some(reference) = order.payment_reference.clone() {
            debug!("💳️ Re-using existing payment intent {reference} for order {}", order.id);
            let intent = self.provider.retrieve_intent(&reference).await?;
            return Ok(CheckoutIntent { order, intent });
        }
        let product = self
            .db
            .fetch_product(&order.product_id)
            .await?
            .ok_or_else(|| PaymentIntentError::ProductNotFound(order.product_id.clone()))?;
        let amount = self.chargeable_amount(order.total_amount, &order.currency)?;
        let request = NewIntentRequest {
            amount,
            currency: order.currency.to_lowercase(),
            metadata: IntentMetadata {
                order_id: order.id.clone(),
                buyer_id: order.buyer_id.clone(),
                product_id: product.id.clone(),
                product_name: product.name.clone(),
            },
        };
        let intent = self.provider.create_intent(request).await?;
        let order = self.db.attach_payment_reference(&order.id, &intent.reference).await?;
        info!("💳️ Created payment intent {} for order {}", intent.reference, order.id);
        self.db
            .log_interaction(NewInteraction::new(
                &order.buyer_id,
                order.buyer_username.clone(),
                InteractionKind::PaymentCreated,
                format!("Payment intent created for {}", product.name),
                "Payment link generated",
            ))
            .await?;
        Ok(CheckoutIntent { order, intent })
    }

    /// Entry point for a purchase from the conversational channel: validate the product, create a `pending`
    /// order for exactly its price, and delegate to [`create_or_get_intent`](Self::create_or_get_intent).
    ///
    /// All validation, including the price floor, happens before the order row is created, so a rejected
    /// purchase leaves no trace in the order book.
    pub async fn create_order_and_intent(
        &self,
        product_id: &str,
        buyer_id: &str,
        buyer_username: Option<String>,
    ) -> Result<NewCheckout, PaymentIntentError> {
        let product = self
            .db
            .fetch_product(product_id)
            .await?
            .ok_or_else(|| PaymentIntentError::ProductNotFound(product_id.to_string()))?;
        if !product.active {
            return Err(PaymentIntentError::ProductInactive(product_id.to_string()));
        }
        self.chargeable_amount(product.price, &product.currency)?;
        let order = self.db.insert_order(NewOrder::for_product(&product, buyer_id, buyer_username)).await?;
        debug!("💳️ Created order {} for product {} and buyer {buyer_id}", order.id, product.id);
        let checkout = self.create_or_get_intent(&order.id).await?;
        Ok(NewCheckout { product, order: checkout.order, intent: checkout.intent })
    }

    fn chargeable_amount(&self, price: Decimal, currency: &str) -> Result<MinorUnits, PaymentIntentError> {
        let amount = MinorUnits::from_decimal(price)?;
        let floor = self.provider.minimum_charge(currency);
        if amount < floor {
            return Err(PaymentIntentError::PriceTooLow(price, floor));
        }
        Ok(amount)
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
