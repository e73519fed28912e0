use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

//--------------------------------------        OrderId        -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    /// Generate a fresh opaque order id. Only uniqueness matters, not any particular scheme.
    pub fn random() -> Self {
        let id: String = thread_rng().sample_iter(&Alphanumeric).take(24).map(char::from).collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------      OrderStatus      -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// The order has been created and no payment outcome has been received yet.
    Pending,
    /// The payment for the order completed successfully. A paid order can still be refunded.
    Paid,
    /// The payment failed or was abandoned. Terminal.
    Cancelled,
    /// A paid order whose charge was subsequently refunded. Terminal.
    Refunded,
}

impl OrderStatus {
    /// The lifecycle transition table. Anything not listed here is a no-op for the ledger.
    pub fn can_transition_to(self, target: OrderStatus) -> bool {
        matches!(
            (self, target),
            (OrderStatus::Pending, OrderStatus::Paid) |
                (OrderStatus::Pending, OrderStatus::Cancelled) |
                (OrderStatus::Paid, OrderStatus::Refunded)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Refunded)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Paid => write!(f, "paid"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
            OrderStatus::Refunded => write!(f, "refunded"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct StatusConversionError(String);

impl FromStr for OrderStatus {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            s => Err(StatusConversionError(s.to_string())),
        }
    }
}

//--------------------------------------        Order          -------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// The Telegram user id of the buyer, as a string. Doubles as the notification chat id.
    pub buyer_id: String,
    pub buyer_username: Option<String>,
    pub product_id: String,
    pub quantity: i64,
    pub total_amount: Decimal,
    pub currency: String,
    pub status: OrderStatus,
    /// The provider-side payment intent id. `None` until the orchestrator creates an intent, then immutable.
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Order {} ({} {} for buyer {}, {})", self.id, self.currency, self.total_amount, self.buyer_id, self.status)
    }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub buyer_id: String,
    pub buyer_username: Option<String>,
    pub product_id: String,
    pub quantity: i64,
    pub total_amount: Decimal,
    pub currency: String,
}

impl NewOrder {
    /// A single-quantity order for exactly the product's current price.
    pub fn for_product(product: &Product, buyer_id: &str, buyer_username: Option<String>) -> Self {
        Self {
            buyer_id: buyer_id.to_string(),
            buyer_username,
            product_id: product.id.clone(),
            quantity: 1,
            total_amount: product.price,
            currency: product.currency.clone(),
        }
    }
}

//--------------------------------------       Product         -------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub currency: String,
    pub image_url: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------   InteractionKind     -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Command,
    Callback,
    Text,
    PaymentCreated,
    PaymentSuccess,
    PaymentFailed,
    PaymentCanceled,
    PaymentRefunded,
}

impl Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InteractionKind::Command => "command",
            InteractionKind::Callback => "callback",
            InteractionKind::Text => "text",
            InteractionKind::PaymentCreated => "payment_created",
            InteractionKind::PaymentSuccess => "payment_success",
            InteractionKind::PaymentFailed => "payment_failed",
            InteractionKind::PaymentCanceled => "payment_canceled",
            InteractionKind::PaymentRefunded => "payment_refunded",
        };
        write!(f, "{s}")
    }
}

//-------------------------------------- InteractionLogEntry   -------------------------------------------------------
/// Append-only audit record of buyer-facing activity. The core only ever writes these; the admin dashboard
/// (out of scope here) is the reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionLogEntry {
    pub id: i64,
    pub buyer_id: String,
    pub buyer_username: Option<String>,
    pub kind: InteractionKind,
    pub content: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewInteraction {
    pub buyer_id: String,
    pub buyer_username: Option<String>,
    pub kind: InteractionKind,
    pub content: String,
    pub response: String,
}

impl NewInteraction {
    pub fn new<S1, S2>(buyer_id: &str, buyer_username: Option<String>, kind: InteractionKind, content: S1, response: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            buyer_id: buyer_id.to_string(),
            buyer_username,
            kind,
            content: content.into(),
            response: response.into(),
        }
    }
}
