use std::{sync::Arc, time::Duration};

use actix_web::{http::StatusCode, test, test::TestRequest, web, web::Data, web::ServiceConfig, App};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use shop_payment_engine::{
    db_types::OrderStatus,
    idempotency::InMemoryEventStore,
    memory::MemoryDatabase,
    traits::{PaymentIntent, ShopDatabase},
    PaymentIntentApi,
    StorefrontApi,
};
use tsg_common::{MinorUnits, Secret};

use crate::{
    endpoint_tests::{
        helpers::{post_json, send, test_product},
        mocks::{MockChannel, MockProvider},
    },
    notifier::Notifier,
    telegram::{telegram_webhook, BotOptions, BotUpdateGuard, SECRET_TOKEN_HEADER},
};

fn new_guard() -> Data<BotUpdateGuard> {
    Data::new(BotUpdateGuard(Arc::new(InMemoryEventStore::new(Duration::from_secs(3600)))))
}

fn open_options() -> BotOptions {
    BotOptions { app_url: "https://shop.example.com".into(), secret_token: Secret::new(String::new()) }
}

fn configure_bot(
    db: MemoryDatabase,
    provider: MockProvider,
    channel: MockChannel,
    guard: Data<BotUpdateGuard>,
    options: BotOptions,
) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(Data::new(PaymentIntentApi::new(db.clone(), provider)))
            .app_data(Data::new(StorefrontApi::new(db)))
            .app_data(Data::new(Notifier::new(channel)))
            .app_data(guard)
            .app_data(Data::new(options))
            .service(
                web::resource("/api/telegram-webhook")
                    .route(web::post().to(telegram_webhook::<MemoryDatabase, MockProvider, MockChannel>)),
            );
    }
}

fn message_update(update_id: i64, text: &str) -> Value {
    json!({
        "update_id": update_id,
        "message": {
            "message_id": 1,
            "from": { "id": 1000001, "username": "alice", "first_name": "Alice" },
            "chat": { "id": 1000001 },
            "text": text
        }
    })
}

fn callback_update(update_id: i64, data: &str) -> Value {
    json!({
        "update_id": update_id,
        "callback_query": {
            "id": "cb_1",
            "from": { "id": 1000001, "username": "alice", "first_name": "Alice" },
            "message": { "message_id": 2, "chat": { "id": 1000001 } },
            "data": data
        }
    })
}

#[actix_web::test]
async fn updates_without_the_secret_token_are_rejected() {
    let db = MemoryDatabase::new();
    let options =
        BotOptions { app_url: "https://shop.example.com".into(), secret_token: Secret::new("tok_123".into()) };
    let update = message_update(1, "/start");
    let (status, _) = post_json(
        "/api/telegram-webhook",
        &update,
        &[],
        configure_bot(db, MockProvider::new(), MockChannel::new(), new_guard(), options),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn updates_with_the_wrong_secret_token_are_rejected() {
    let db = MemoryDatabase::new();
    let options =
        BotOptions { app_url: "https://shop.example.com".into(), secret_token: Secret::new("tok_123".into()) };
    let update = message_update(1, "/start");
    let (status, _) = post_json(
        "/api/telegram-webhook",
        &update,
        &[(SECRET_TOKEN_HEADER, "tok_wrong")],
        configure_bot(db, MockProvider::new(), MockChannel::new(), new_guard(), options),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn updates_with_the_correct_secret_token_are_accepted() {
    let db = MemoryDatabase::new();
    let options =
        BotOptions { app_url: "https://shop.example.com".into(), secret_token: Secret::new("tok_123".into()) };
    let mut channel = MockChannel::new();
    channel.expect_send_message().times(1).returning(|_, _, _| Ok(()));
    let update = message_update(1, "/start");
    let (status, body) = post_json(
        "/api/telegram-webhook",
        &update,
        &[(SECRET_TOKEN_HEADER, "tok_123")],
        configure_bot(db, MockProvider::new(), channel, new_guard(), options),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("true"));
}

#[actix_web::test]
async fn duplicate_updates_are_dispatched_once() {
    let db = MemoryDatabase::new();
    let mut channel = MockChannel::new();
    channel.expect_send_message().times(1).returning(|_, _, _| Ok(()));
    let service = test::init_service(
        App::new().configure(configure_bot(db, MockProvider::new(), channel, new_guard(), open_options())),
    )
    .await;
    let update = message_update(42, "/start");
    let (first, _) = send(&service, TestRequest::post().uri("/api/telegram-webhook").set_json(&update)).await;
    let (second, body) = send(&service, TestRequest::post().uri("/api/telegram-webhook").set_json(&update)).await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert!(body.contains("true"));
}

#[actix_web::test]
async fn start_command_sends_the_welcome_message() {
    let db = MemoryDatabase::new();
    let mut channel = MockChannel::new();
    channel
        .expect_send_message()
        .withf(|chat_id, text, keyboard| *chat_id == 1000001 && text.contains("Welcome") && keyboard.is_some())
        .times(1)
        .returning(|_, _, _| Ok(()));
    let update = message_update(1, "/start");
    let (status, _) = post_json(
        "/api/telegram-webhook",
        &update,
        &[],
        configure_bot(db, MockProvider::new(), channel, new_guard(), open_options()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn products_command_lists_active_products() {
    let db = MemoryDatabase::new();
    db.upsert_product(test_product("prod-1", dec!(25.00), true)).await.unwrap();
    db.upsert_product(test_product("prod-2", dec!(12.50), true)).await.unwrap();
    db.upsert_product(test_product("prod-hidden", dec!(99.00), false)).await.unwrap();
    let mut channel = MockChannel::new();
    channel
        .expect_send_message()
        .withf(|_, text, _| {
            text.contains("Available Products") &&
                text.contains("Product prod-1") &&
                text.contains("Product prod-2") &&
                !text.contains("prod-hidden")
        })
        .times(1)
        .returning(|_, _, _| Ok(()));
    let update = message_update(1, "/products");
    let (status, _) = post_json(
        "/api/telegram-webhook",
        &update,
        &[],
        configure_bot(db, MockProvider::new(), channel, new_guard(), open_options()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn unknown_commands_get_a_hint() {
    let db = MemoryDatabase::new();
    let mut channel = MockChannel::new();
    channel
        .expect_send_message()
        .withf(|_, text, _| text.contains("didn't understand"))
        .times(1)
        .returning(|_, _, _| Ok(()));
    let update = message_update(1, "/frobnicate");
    let (status, _) = post_json(
        "/api/telegram-webhook",
        &update,
        &[],
        configure_bot(db, MockProvider::new(), channel, new_guard(), open_options()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn buy_callback_creates_an_order_and_sends_the_payment_link() {
    let db = MemoryDatabase::new();
    db.upsert_product(test_product("prod-1", dec!(25.00), true)).await.unwrap();
    let mut provider = MockProvider::new();
    provider.expect_minimum_charge().returning(|_| MinorUnits::from(50));
    provider.expect_create_intent().times(1).returning(|_| {
        Ok(PaymentIntent { reference: "pi_test_1".into(), client_secret: "pi_test_1_secret".into() })
    });
    let mut channel = MockChannel::new();
    channel
        .expect_send_message()
        .withf(|chat_id, text, _| {
            *chat_id == 1000001 && text.contains("Payment Details") && text.contains("/checkout?order=")
        })
        .times(1)
        .returning(|_, _, _| Ok(()));
    channel.expect_acknowledge_callback().times(1).returning(|_| Ok(()));

    let update = callback_update(7, "buy_prod-1");
    let (status, _) = post_json(
        "/api/telegram-webhook",
        &update,
        &[],
        configure_bot(db.clone(), provider, channel, new_guard(), open_options()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let orders = db.fetch_orders_for_buyer("1000001").await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatus::Pending);
    assert_eq!(orders[0].payment_reference.as_deref(), Some("pi_test_1"));
}

#[actix_web::test]
async fn buying_an_inactive_product_sends_an_apology() {
    let db = MemoryDatabase::new();
    db.upsert_product(test_product("prod-1", dec!(25.00), false)).await.unwrap();
    let mut channel = MockChannel::new();
    channel
        .expect_send_message()
        .withf(|_, text, _| text.contains("no longer available"))
        .times(1)
        .returning(|_, _, _| Ok(()));
    channel.expect_acknowledge_callback().times(1).returning(|_| Ok(()));
    let update = callback_update(8, "buy_prod-1");
    let (status, _) = post_json(
        "/api/telegram-webhook",
        &update,
        &[],
        configure_bot(db.clone(), MockProvider::new(), channel, new_guard(), open_options()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(db.fetch_orders_for_buyer("1000001").await.unwrap().is_empty());
}

#[actix_web::test]
async fn callbacks_without_a_message_are_still_acknowledged() {
    let db = MemoryDatabase::new();
    let mut channel = MockChannel::new();
    channel.expect_acknowledge_callback().withf(|id| id == "cb_orphan").times(1).returning(|_| Ok(()));
    // No message in the callback, so there is no chat to reply to, but the spinner must still be dismissed
    let update = json!({
        "update_id": 11,
        "callback_query": {
            "id": "cb_orphan",
            "from": { "id": 1000001, "username": "alice", "first_name": "Alice" },
            "data": "show_products"
        }
    });
    let (status, _) = post_json(
        "/api/telegram-webhook",
        &update,
        &[],
        configure_bot(db, MockProvider::new(), channel, new_guard(), open_options()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn my_orders_callback_lists_the_buyers_orders() {
    let db = MemoryDatabase::new();
    let product = test_product("prod-1", dec!(25.00), true);
    db.upsert_product(product.clone()).await.unwrap();
    let order = crate::endpoint_tests::helpers::seed_order(&db, &product, "pi_100").await;
    db.checked_update_status(&order.id, OrderStatus::Pending, OrderStatus::Paid).await.unwrap();
    let mut channel = MockChannel::new();
    channel
        .expect_send_message()
        .withf(|_, text, _| text.contains("Your Orders") && text.contains("Product prod-1") && text.contains("PAID"))
        .times(1)
        .returning(|_, _, _| Ok(()));
    channel.expect_acknowledge_callback().times(1).returning(|_| Ok(()));
    let update = callback_update(9, "my_orders");
    let (status, _) = post_json(
        "/api/telegram-webhook",
        &update,
        &[],
        configure_bot(db, MockProvider::new(), channel, new_guard(), open_options()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
