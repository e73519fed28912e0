//! The Stripe webhook gate.
//!
//! Stripe delivers payment lifecycle events to `/api/stripe-webhook` with at-least-once semantics. The
//! signature is checked by [`SignatureMiddlewareFactory`](crate::middleware::SignatureMiddlewareFactory) before
//! this handler runs. After the duplicate check on the event id, the event is mapped onto an order ledger
//! transition; events that refer to no known order, arrive out of order, or carry an unhandled type are
//! acknowledged with a 200 so that Stripe stops redelivering them.

use std::{collections::HashMap, sync::Arc};

use actix_web::{web, HttpResponse};
use log::*;
use serde::Deserialize;
use serde_json::Value;
use shop_payment_engine::{
    db_types::{InteractionKind, NewInteraction, Order, OrderStatus},
    idempotency::ProcessedEventStore,
    traits::ShopDatabase,
    OrderLedgerApi,
    StorefrontApi,
};
use tsg_common::MinorUnits;

use crate::{
    data_objects::WebhookAck,
    errors::ServerError,
    notifier::{NotificationChannel, NotificationKind, Notifier},
};

pub const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

/// The duplicate-suppression guard for payment events. A newtype so it can coexist with the bot update guard
/// in the app data map.
#[derive(Clone)]
pub struct PaymentEventGuard(pub Arc<dyn ProcessedEventStore>);

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: Value,
}

/// The fields of a `payment_intent` object the gate cares about.
#[derive(Debug, Clone, Deserialize)]
struct PaymentIntentObject {
    pub id: String,
    #[serde(default)]
    #[allow(dead_code)]
    pub metadata: HashMap<String, String>,
}

/// The fields of a `charge` object the gate cares about.
#[derive(Debug, Clone, Deserialize)]
struct ChargeObject {
    pub payment_intent: Option<String>,
    pub amount_refunded: i64,
    pub currency: String,
}

pub async fn stripe_webhook<B, C>(
    event: web::Json<StripeEvent>,
    ledger: web::Data<OrderLedgerApi<B>>,
    storefront: web::Data<StorefrontApi<B>>,
    notifier: web::Data<Notifier<C>>,
    guard: web::Data<PaymentEventGuard>,
) -> Result<HttpResponse, ServerError>
where
    B: ShopDatabase,
    C: NotificationChannel,
{
    let event = event.into_inner();
    if !guard.0.first_sighting(&event.id) {
        info!("💸️ Event {} already processed, skipping", event.id);
        return Ok(HttpResponse::Ok().json(WebhookAck::already_processed()));
    }
    info!("💸️ Processing webhook event: {} ({})", event.kind, event.id);
    match event.kind.as_str() {
        "payment_intent.succeeded" => {
            handle_payment_event(&event, OrderStatus::Paid, &ledger, &storefront, &notifier).await?;
        },
        "payment_intent.payment_failed" | "payment_intent.canceled" => {
            handle_payment_event(&event, OrderStatus::Cancelled, &ledger, &storefront, &notifier).await?;
        },
        "charge.refunded" => {
            handle_charge_refunded(&event, &ledger, &storefront, &notifier).await?;
        },
        other => {
            debug!("💸️ Unhandled event type {other}");
        },
    }
    Ok(HttpResponse::Ok().json(WebhookAck::processed(&event.id)))
}

/// Apply a `payment_intent.*` event to the order it references.
async fn handle_payment_event<B, C>(
    event: &StripeEvent,
    target: OrderStatus,
    ledger: &OrderLedgerApi<B>,
    storefront: &StorefrontApi<B>,
    notifier: &Notifier<C>,
) -> Result<(), ServerError>
where
    B: ShopDatabase,
    C: NotificationChannel,
{
    let intent: PaymentIntentObject = serde_json::from_value(event.data.object.clone())
        .map_err(|e| ServerError::BackendError(format!("Malformed payment_intent object in {}: {e}", event.id)))?;
    let Some(order) = ledger.find_by_payment_reference(&intent.id).await? else {
        warn!("💸️ {} received but no order found for payment intent {}", event.kind, intent.id);
        return Ok(());
    };
    let outcome = ledger.transition(&order.id, target).await?;
    if !outcome.is_applied() {
        // Stale or out-of-order delivery; the dedup guard cannot catch distinct event ids for the same outcome
        info!("💸️ {} for order {} did not change its status ({})", event.kind, order.id, outcome.order().status);
        return Ok(());
    }
    let order = outcome.order().clone();
    let product_name = product_name_for(&order, storefront).await;
    let (interaction_kind, notification) = match event.kind.as_str() {
        "payment_intent.succeeded" => (InteractionKind::PaymentSuccess, NotificationKind::PaymentSuccess),
        "payment_intent.canceled" => (InteractionKind::PaymentCanceled, NotificationKind::PaymentCanceled),
        _ => (InteractionKind::PaymentFailed, NotificationKind::PaymentFailed),
    };
    info!("💸️ Order {} is now {} following {}", order.id, order.status, event.kind);
    notifier.order_event(&order, &product_name, notification).await;
    storefront
        .log_interaction(NewInteraction::new(
            &order.buyer_id,
            order.buyer_username.clone(),
            interaction_kind,
            format!("{} for {product_name}", describe(interaction_kind)),
            format!("{} notification sent", describe(interaction_kind)),
        ))
        .await;
    Ok(())
}

/// Apply a `charge.refunded` event to the paid order its payment intent references.
async fn handle_charge_refunded<B, C>(
    event: &StripeEvent,
    ledger: &OrderLedgerApi<B>,
    storefront: &StorefrontApi<B>,
    notifier: &Notifier<C>,
) -> Result<(), ServerError>
where
    B: ShopDatabase,
    C: NotificationChannel,
{
    let charge: ChargeObject = serde_json::from_value(event.data.object.clone())
        .map_err(|e| ServerError::BackendError(format!("Malformed charge object in {}: {e}", event.id)))?;
    let Some(reference) = charge.payment_intent else {
        warn!("💸️ Charge refunded event {} carries no payment intent reference", event.id);
        return Ok(());
    };
    let Some(order) = ledger.find_by_payment_reference(&reference).await? else {
        warn!("💸️ Charge refunded but no order found for payment intent {reference}");
        return Ok(());
    };
    let outcome = ledger.transition(&order.id, OrderStatus::Refunded).await?;
    if !outcome.is_applied() {
        info!("💸️ Refund event for order {} did not change its status ({})", order.id, outcome.order().status);
        return Ok(());
    }
    let order = outcome.order().clone();
    let product_name = product_name_for(&order, storefront).await;
    // The refunded amount is reported verbatim from the provider; partial refunds still move the order to
    // refunded.
    let amount = MinorUnits::from(charge.amount_refunded).to_decimal().to_string();
    let currency = charge.currency.to_uppercase();
    info!("💸️ Charge refunded for order {} (Amount: {currency} {amount})", order.id);
    notifier.order_event(&order, &product_name, NotificationKind::PaymentRefunded { amount, currency }).await;
    storefront
        .log_interaction(NewInteraction::new(
            &order.buyer_id,
            order.buyer_username.clone(),
            InteractionKind::PaymentRefunded,
            format!("Refund processed for {product_name}"),
            "Refund notification sent",
        ))
        .await;
    Ok(())
}

async fn product_name_for<B: ShopDatabase>(order: &Order, storefront: &StorefrontApi<B>) -> String {
    match storefront.product(&order.product_id).await {
        Ok(Some(product)) => product.name,
        _ => order.product_id.clone(),
    }
}

fn describe(kind: InteractionKind) -> &'static str {
    match kind {
        InteractionKind::PaymentSuccess => "Payment successful",
        InteractionKind::PaymentFailed => "Payment failed",
        InteractionKind::PaymentCanceled => "Payment canceled",
        _ => "Payment event",
    }
}
