//! Buyer notifications over the conversational channel.
//!
//! Every order lifecycle event produces at most one message to the buyer's chat. Sends are awaited so that
//! failures surface in the logs, but a failed send never fails the event that triggered it: the order status is
//! the source of truth and the message is advisory.

use log::*;
use shop_payment_engine::db_types::Order;
use thiserror::Error;

use crate::telegram::types::{InlineKeyboardButton, InlineKeyboardMarkup};

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("The notification request failed. {0}")]
    RequestFailed(String),
    #[error("The notification API rejected the call. {0}")]
    ApiError(String),
}

/// The transport used to reach buyers. The production implementation is
/// [`TelegramApi`](crate::integrations::TelegramApi); tests substitute a mock.
#[allow(async_fn_in_trait)]
pub trait NotificationChannel {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<(), ChannelError>;

    /// Dismiss the progress indicator on an inline keyboard button press.
    async fn acknowledge_callback(&self, callback_id: &str) -> Result<(), ChannelError>;
}

/// A lifecycle event worth telling the buyer about.
#[derive(Debug, Clone)]
pub enum NotificationKind {
    PaymentCreated { checkout_url: String },
    PaymentSuccess,
    PaymentFailed,
    PaymentCanceled,
    PaymentRefunded { amount: String, currency: String },
}

pub struct Notifier<C> {
    channel: C,
}

impl<C> Notifier<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }
}

impl<C> Notifier<C>
where C: NotificationChannel
{
    /// Tell the buyer about an order lifecycle event. The buyer id doubles as the chat id; an order whose buyer
    /// id is not numeric cannot be notified and is logged instead.
    pub async fn order_event(&self, order: &Order, product_name: &str, kind: NotificationKind) {
        let chat_id = match order.buyer_id.parse::<i64>() {
            Ok(id) => id,
            Err(_) => {
                warn!("📣️ Cannot notify buyer {} of order {}: not a valid chat id", order.buyer_id, order.id);
                return;
            },
        };
        let (text, keyboard) = render(order, product_name, &kind);
        self.send(chat_id, &text, keyboard).await;
    }

    /// Send a message, logging and swallowing failures.
    pub async fn send(&self, chat_id: i64, text: &str, keyboard: Option<InlineKeyboardMarkup>) {
        if let Err(e) = self.channel.send_message(chat_id, text, keyboard).await {
            warn!("📣️ Could not deliver message to chat {chat_id}. {e}");
        }
    }

    pub async fn acknowledge(&self, callback_id: &str) {
        if let Err(e) = self.channel.acknowledge_callback(callback_id).await {
            warn!("📣️ Could not acknowledge callback {callback_id}. {e}");
        }
    }
}

fn render(order: &Order, product_name: &str, kind: &NotificationKind) -> (String, Option<InlineKeyboardMarkup>) {
    let now = chrono::Utc::now().format("%Y-%m-%d %H:%M UTC");
    match kind {
        NotificationKind::PaymentCreated { checkout_url } => {
            let text = format!(
                "💳 <b>Payment Details</b>\n\n📦 <b>Product:</b> {product_name}\n💰 <b>Amount:</b> {} {}\n🆔 \
                 <b>Order ID:</b> {}\n\n🔗 Complete your payment using this secure link:\n{checkout_url}\n\n⏱️ Your \
                 order will be confirmed once payment is completed.\n🔒 Payments are securely processed by Stripe.",
                order.currency, order.total_amount, order.id
            );
            let keyboard = InlineKeyboardMarkup::rows(vec![
                vec![InlineKeyboardButton::link("🔗 Open Payment Link", checkout_url)],
                vec![InlineKeyboardButton::callback("🛍️ Back to Products", "show_products")],
            ]);
            (text, Some(keyboard))
        },
        NotificationKind::PaymentSuccess => {
            let text = format!(
                "🎉 <b>Payment Successful!</b>\n\n✅ Your payment for <b>{product_name}</b> has been processed \
                 successfully.\n\n💰 <b>Amount:</b> {} {}\n🆔 <b>Order ID:</b> {}\n📅 <b>Date:</b> {now}\n\nThank you \
                 for your purchase! 🛍️",
                order.currency, order.total_amount, order.id
            );
            (text, None)
        },
        NotificationKind::PaymentFailed => {
            let text = format!(
                "❌ <b>Payment Failed</b>\n\n💳 Unfortunately, your payment for <b>{product_name}</b> could not be \
                 processed.\n\n💰 <b>Amount:</b> {} {}\n🆔 <b>Order ID:</b> {}\n\nPlease try again or contact support \
                 if the issue persists.",
                order.currency, order.total_amount, order.id
            );
            (text, None)
        },
        NotificationKind::PaymentCanceled => {
            let text = format!(
                "⏹️ <b>Payment Canceled</b>\n\n🚫 Your payment for <b>{product_name}</b> was canceled.\n\n💰 \
                 <b>Amount:</b> {} {}\n🆔 <b>Order ID:</b> {}\n\nYou can restart the payment process anytime by \
                 visiting the product again.",
                order.currency, order.total_amount, order.id
            );
            (text, None)
        },
        NotificationKind::PaymentRefunded { amount, currency } => {
            let text = format!(
                "🔄 <b>Refund Processed</b>\n\n✅ Your refund for <b>{product_name}</b> has been processed \
                 successfully.\n\n💰 <b>Refunded Amount:</b> {currency} {amount}\n🆔 <b>Order ID:</b> {}\n📅 \
                 <b>Date:</b> {now}\n\nThe refund will appear in your account within 5-10 business days.",
                order.id
            );
            (text, None)
        },
    }
}
