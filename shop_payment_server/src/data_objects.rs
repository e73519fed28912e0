use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shop_payment_engine::db_types::{Order, OrderId, OrderStatus, Product};

/// Request body for `POST /api/create-payment-intent`. Field names match what the bot frontend sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntentRequest {
    #[serde(rename = "productId")]
    pub product_id: String,
    #[serde(rename = "telegramUserId")]
    pub telegram_user_id: String,
    #[serde(rename = "telegramUsername")]
    pub telegram_username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntentResult {
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
    #[serde(rename = "orderId")]
    pub order_id: OrderId,
    #[serde(rename = "productName")]
    pub product_name: String,
    pub amount: Decimal,
    pub currency: String,
}

/// Response for `POST /api/orders/{id}/payment-intent`. The checkout page only needs the client secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutIntentResult {
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
    #[serde(rename = "orderId")]
    pub order_id: OrderId,
}

/// Acknowledgement body for the Stripe webhook. Always sent with a 200 so the provider stops retrying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(rename = "eventId", skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl WebhookAck {
    pub fn processed(event_id: &str) -> Self {
        Self { received: true, event_id: Some(event_id.to_string()), status: None }
    }

    pub fn already_processed() -> Self {
        Self { received: true, event_id: None, status: Some("already_processed".to_string()) }
    }
}

/// Acknowledgement body for the Telegram webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAck {
    pub ok: bool,
}

//----------------------------------------  Public checkout projection  -----------------------------------------------
/// The sanitized order view served to the public checkout page. Buyer identifiers and the payment reference are
/// deliberately absent: the order id is the only capability needed to pay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicOrder {
    pub id: OrderId,
    pub product_id: String,
    pub quantity: i64,
    pub total_amount: Decimal,
    pub currency: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub product: PublicProduct,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicProduct {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub currency: String,
    pub image_url: Option<String>,
}

impl PublicOrder {
    pub fn from_parts(order: Order, product: Product) -> Self {
        Self {
            id: order.id,
            product_id: order.product_id,
            quantity: order.quantity,
            total_amount: order.total_amount,
            currency: order.currency,
            status: order.status,
            created_at: order.created_at,
            product: PublicProduct {
                id: product.id,
                name: product.name,
                description: product.description,
                price: product.price,
                currency: product.currency,
                image_url: product.image_url,
            },
        }
    }
}
