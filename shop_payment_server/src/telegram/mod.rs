//! The Telegram bot gate.
//!
//! Telegram delivers bot updates to `/api/telegram-webhook`, optionally authenticated with a shared secret
//! token header. After the duplicate check on `update_id`, the update is dispatched to a command or callback
//! handler. Dispatch failures are logged and the update is still acknowledged with a 200: Telegram redelivers
//! un-acked updates, and a handler bug should not cause an endless redelivery loop.

pub mod types;

use std::sync::Arc;

use actix_web::{web, HttpRequest, HttpResponse};
use log::*;
use shop_payment_engine::{
    db_types::{InteractionKind, NewInteraction, OrderStatus},
    idempotency::ProcessedEventStore,
    intents::PaymentIntentError,
    traits::{PaymentProvider, ShopDatabase},
    PaymentIntentApi,
    StorefrontApi,
};
use tsg_common::Secret;

use crate::{
    data_objects::UpdateAck,
    errors::{AuthError, ServerError},
    notifier::{NotificationChannel, NotificationKind, Notifier},
    telegram::types::{CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, Message, TelegramUpdate},
};

pub const SECRET_TOKEN_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

/// The duplicate-suppression guard for bot updates. A newtype so it can coexist with the payment event guard
/// in the app data map.
#[derive(Clone)]
pub struct BotUpdateGuard(pub Arc<dyn ProcessedEventStore>);

/// The non-secret-ish subset of configuration the bot handlers need. Passed around as app data.
#[derive(Clone, Debug)]
pub struct BotOptions {
    pub app_url: String,
    /// Empty means the secret token header is not checked.
    pub secret_token: Secret<String>,
}

pub async fn telegram_webhook<B, P, C>(
    req: HttpRequest,
    update: web::Json<TelegramUpdate>,
    intents: web::Data<PaymentIntentApi<B, P>>,
    storefront: web::Data<StorefrontApi<B>>,
    notifier: web::Data<Notifier<C>>,
    guard: web::Data<BotUpdateGuard>,
    options: web::Data<BotOptions>,
) -> Result<HttpResponse, ServerError>
where
    B: ShopDatabase,
    P: PaymentProvider,
    C: NotificationChannel,
{
    trace!("🤖️ Received Telegram webhook call");
    let expected = options.secret_token.reveal();
    if !expected.is_empty() {
        let provided = req.headers().get(SECRET_TOKEN_HEADER).and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_str()) {
            warn!("🤖️ Unauthorized Telegram webhook request");
            return Err(AuthError::InvalidSecretToken.into());
        }
    }
    let update = update.into_inner();
    let update_id = update.update_id;
    if !guard.0.first_sighting(&update_id.to_string()) {
        info!("🤖️ Update {update_id} already processed, skipping");
        return Ok(HttpResponse::Ok().json(UpdateAck { ok: true }));
    }
    dispatch_update(update, &intents, &storefront, &notifier, &options).await;
    Ok(HttpResponse::Ok().json(UpdateAck { ok: true }))
}

/// Route the update to its handler. All handler failures end here as a logged warning and an apology message to
/// the buyer where a chat id is known; the webhook call itself always succeeds.
async fn dispatch_update<B, P, C>(
    update: TelegramUpdate,
    intents: &PaymentIntentApi<B, P>,
    storefront: &StorefrontApi<B>,
    notifier: &Notifier<C>,
    options: &BotOptions,
) where
    B: ShopDatabase,
    P: PaymentProvider,
    C: NotificationChannel,
{
    if let Some(message) = update.message {
        handle_message(message, storefront, notifier).await;
    } else if let Some(callback) = update.callback_query {
        handle_callback(callback, intents, storefront, notifier, options).await;
    }
}

async fn handle_message<B, C>(message: Message, storefront: &StorefrontApi<B>, notifier: &Notifier<C>)
where
    B: ShopDatabase,
    C: NotificationChannel,
{
    let chat_id = message.chat.id;
    let buyer_id = message.from.as_ref().map(|u| u.id).unwrap_or(chat_id).to_string();
    let username = message.from.as_ref().and_then(|u| u.username.clone());
    let Some(text) = message.text else {
        return;
    };
    storefront
        .log_interaction(NewInteraction::new(&buyer_id, username.clone(), InteractionKind::Text, text.clone(), ""))
        .await;
    if text.starts_with("/start") {
        send_welcome(chat_id, notifier).await;
    } else if text.starts_with("/products") {
        show_products(chat_id, storefront, notifier).await;
    } else if text.starts_with("/help") {
        send_help(chat_id, notifier).await;
    } else {
        send_unknown(chat_id, notifier).await;
    }
}

async fn handle_callback<B, P, C>(
    callback: CallbackQuery,
    intents: &PaymentIntentApi<B, P>,
    storefront: &StorefrontApi<B>,
    notifier: &Notifier<C>,
    options: &BotOptions,
) where
    B: ShopDatabase,
    P: PaymentProvider,
    C: NotificationChannel,
{
    let buyer_id = callback.from.id.to_string();
    let username = callback.from.username.clone();
    let (Some(data), Some(chat_id)) = (callback.data, callback.message.map(|m| m.chat.id)) else {
        // Even an unusable callback must be acknowledged, or the buyer's button spinner hangs
        notifier.acknowledge(&callback.id).await;
        return;
    };
    storefront
        .log_interaction(NewInteraction::new(&buyer_id, username.clone(), InteractionKind::Callback, data.clone(), ""))
        .await;
    if data == "show_products" {
        show_products(chat_id, storefront, notifier).await;
    } else if let Some(product_id) = data.strip_prefix("buy_") {
        handle_purchase(chat_id, &buyer_id, username, product_id, intents, storefront, notifier, options).await;
    } else if let Some(product_id) = data.strip_prefix("info_") {
        show_product_info(chat_id, product_id, storefront, notifier).await;
    } else if data == "my_orders" {
        show_buyer_orders(chat_id, &buyer_id, storefront, notifier).await;
    } else if data == "help" {
        send_help(chat_id, notifier).await;
    }
    notifier.acknowledge(&callback.id).await;
}

async fn send_welcome<C: NotificationChannel>(chat_id: i64, notifier: &Notifier<C>) {
    let text = "🎉 <b>Welcome to our store!</b>\n\nI'm your personal shopping assistant bot. Here's what I can help \
                you with:\n\n🛍️ Browse our products\n💳 Process secure payments\n📦 Track your orders\n❓ Get \
                support\n\nReady to start shopping?";
    let keyboard = InlineKeyboardMarkup::rows(vec![
        vec![InlineKeyboardButton::callback("🛍️ View Products", "show_products")],
        vec![InlineKeyboardButton::callback("📦 My Orders", "my_orders")],
    ]);
    notifier.send(chat_id, text, Some(keyboard)).await;
}

async fn send_help<C: NotificationChannel>(chat_id: i64, notifier: &Notifier<C>) {
    let text = "🤖 <b>Bot Commands:</b>\n\n/start - Welcome message and main menu\n/products - Browse available \
                products\n/help - Show this help message\n\n💡 <b>How to buy:</b>\n1. Use /products or click \"View \
                Products\"\n2. Select a product you want\n3. Complete payment via secure Stripe checkout\n4. Receive \
                confirmation and access\n\n🔒 All payments are processed securely through Stripe.";
    notifier.send(chat_id, text, None).await;
}

async fn send_unknown<C: NotificationChannel>(chat_id: i64, notifier: &Notifier<C>) {
    let text = "❓ I didn't understand that command.\n\nUse /help to see available commands or click the buttons \
                below:";
    let keyboard = InlineKeyboardMarkup::rows(vec![
        vec![InlineKeyboardButton::callback("🛍️ View Products", "show_products")],
        vec![InlineKeyboardButton::callback("❓ Help", "help")],
    ]);
    notifier.send(chat_id, text, Some(keyboard)).await;
}

async fn show_products<B, C>(chat_id: i64, storefront: &StorefrontApi<B>, notifier: &Notifier<C>)
where
    B: ShopDatabase,
    C: NotificationChannel,
{
    let products = match storefront.active_products().await {
        Ok(products) => products,
        Err(e) => {
            warn!("🤖️ Could not load the product catalog. {e}");
            notifier
                .send(chat_id, "❌ Sorry, there was an error loading products. Please try again later.", None)
                .await;
            return;
        },
    };
    if products.is_empty() {
        notifier.send(chat_id, "🚫 No products available at the moment. Please check back later!", None).await;
        return;
    }
    let mut text = "🛍️ <b>Available Products:</b>\n\n".to_string();
    let mut keyboard = InlineKeyboardMarkup::default();
    // Keep the message within Telegram's limits
    for (index, product) in products.iter().take(10).enumerate() {
        text.push_str(&format!(
            "{}. <b>{}</b>\n💰 {} {}\n📝 {}\n\n",
            index + 1,
            product.name,
            product.currency,
            product.price,
            product.description
        ));
        keyboard.push_row(vec![
            InlineKeyboardButton::callback(format!("💳 Buy {}", product.name), format!("buy_{}", product.id)),
            InlineKeyboardButton::callback("ℹ️ More Info", format!("info_{}", product.id)),
        ]);
    }
    keyboard.push_row(vec![InlineKeyboardButton::callback("📦 My Orders", "my_orders")]);
    notifier.send(chat_id, &text, Some(keyboard)).await;
}

async fn show_product_info<B, C>(chat_id: i64, product_id: &str, storefront: &StorefrontApi<B>, notifier: &Notifier<C>)
where
    B: ShopDatabase,
    C: NotificationChannel,
{
    match storefront.product(product_id).await {
        Ok(Some(product)) if product.active => {
            let text = format!(
                "📦 <b>{}</b>\n\n💰 <b>Price:</b> {} {}\n\n📝 <b>Description:</b>\n{}\n\nReady to purchase?",
                product.name, product.currency, product.price, product.description
            );
            let keyboard = InlineKeyboardMarkup::rows(vec![
                vec![InlineKeyboardButton::callback(
                    format!("💳 Buy Now - {} {}", product.currency, product.price),
                    format!("buy_{}", product.id),
                )],
                vec![InlineKeyboardButton::callback("🛍️ Back to Products", "show_products")],
            ]);
            notifier.send(chat_id, &text, Some(keyboard)).await;
        },
        Ok(_) => {
            notifier.send(chat_id, "❌ Product not found or unavailable.", None).await;
        },
        Err(e) => {
            warn!("🤖️ Could not load product {product_id}. {e}");
            notifier.send(chat_id, "❌ Sorry, there was an error loading product details.", None).await;
        },
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_purchase<B, P, C>(
    chat_id: i64,
    buyer_id: &str,
    username: Option<String>,
    product_id: &str,
    intents: &PaymentIntentApi<B, P>,
    storefront: &StorefrontApi<B>,
    notifier: &Notifier<C>,
    options: &BotOptions,
) where
    B: ShopDatabase,
    P: PaymentProvider,
    C: NotificationChannel,
{
    match intents.create_order_and_intent(product_id, buyer_id, username.clone()).await {
        Ok(checkout) => {
            let checkout_url = format!("{}/checkout?order={}", options.app_url, checkout.order.id.as_str());
            notifier
                .order_event(&checkout.order, &checkout.product.name, NotificationKind::PaymentCreated {
                    checkout_url,
                })
                .await;
            storefront
                .log_interaction(NewInteraction::new(
                    buyer_id,
                    username,
                    InteractionKind::Callback,
                    format!("Purchase initiated for product {product_id}"),
                    format!("Payment link sent for order {}", checkout.order.id),
                ))
                .await;
        },
        Err(PaymentIntentError::ProductNotFound(_)) | Err(PaymentIntentError::ProductInactive(_)) => {
            notifier.send(chat_id, "❌ Sorry, this product is no longer available.", None).await;
        },
        Err(e) => {
            warn!("🤖️ Purchase of product {product_id} for buyer {buyer_id} failed. {e}");
            notifier
                .send(chat_id, "❌ Sorry, there was an error processing your request. Please try again later.", None)
                .await;
        },
    }
}

async fn show_buyer_orders<B, C>(chat_id: i64, buyer_id: &str, storefront: &StorefrontApi<B>, notifier: &Notifier<C>)
where
    B: ShopDatabase,
    C: NotificationChannel,
{
    let orders = match storefront.orders_for_buyer(buyer_id).await {
        Ok(orders) => orders,
        Err(e) => {
            warn!("🤖️ Could not load orders for buyer {buyer_id}. {e}");
            notifier.send(chat_id, "❌ Sorry, there was an error loading your orders.", None).await;
            return;
        },
    };
    if orders.is_empty() {
        notifier.send(chat_id, "📦 You have no orders yet. Start shopping to see your orders here!", None).await;
        return;
    }
    let mut text = "📦 <b>Your Orders:</b>\n\n".to_string();
    for (index, order) in orders.iter().take(5).enumerate() {
        let product_name = match storefront.product(&order.product_id).await {
            Ok(Some(product)) => product.name,
            _ => order.product_id.clone(),
        };
        text.push_str(&format!(
            "{}. <b>{}</b>\n💰 {} {}\n📅 {}\n{} Status: {}\n\n",
            index + 1,
            product_name,
            order.currency,
            order.total_amount,
            order.created_at.format("%Y-%m-%d"),
            status_emoji(order.status),
            order.status.to_string().to_uppercase()
        ));
    }
    let keyboard =
        InlineKeyboardMarkup::rows(vec![vec![InlineKeyboardButton::callback("🛍️ Shop More", "show_products")]]);
    notifier.send(chat_id, &text, Some(keyboard)).await;
}

fn status_emoji(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "⏳",
        OrderStatus::Paid => "✅",
        OrderStatus::Cancelled => "❌",
        OrderStatus::Refunded => "🔄",
    }
}
