use std::{sync::Arc, time::Duration};

use actix_web::{http::StatusCode, test, test::TestRequest, web, web::Data, web::ServiceConfig, App};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use shop_payment_engine::{
    db_types::OrderStatus,
    idempotency::InMemoryEventStore,
    memory::MemoryDatabase,
    traits::ShopDatabase,
    OrderLedgerApi,
    StorefrontApi,
};
use tsg_common::Secret;

use crate::{
    endpoint_tests::{
        helpers::{post_json, post_raw, seed_order, send, test_product},
        mocks::MockChannel,
    },
    helpers::calculate_signature,
    middleware::SignatureMiddlewareFactory,
    notifier::Notifier,
    stripe_webhook::{stripe_webhook, PaymentEventGuard, STRIPE_SIGNATURE_HEADER},
};

fn new_guard() -> Data<PaymentEventGuard> {
    Data::new(PaymentEventGuard(Arc::new(InMemoryEventStore::new(Duration::from_secs(3600)))))
}

fn configure_webhook(
    db: MemoryDatabase,
    channel: MockChannel,
    guard: Data<PaymentEventGuard>,
) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(Data::new(OrderLedgerApi::new(db.clone())))
            .app_data(Data::new(StorefrontApi::new(db.clone())))
            .app_data(Data::new(Notifier::new(channel)))
            .app_data(guard)
            .service(
                web::resource("/api/stripe-webhook")
                    .route(web::post().to(stripe_webhook::<MemoryDatabase, MockChannel>)),
            );
    }
}

fn intent_event(event_id: &str, kind: &str, reference: &str) -> Value {
    json!({
        "id": event_id,
        "type": kind,
        "data": { "object": { "id": reference, "metadata": {} } }
    })
}

fn refund_event(event_id: &str, reference: &str, amount_refunded: i64, currency: &str) -> Value {
    json!({
        "id": event_id,
        "type": "charge.refunded",
        "data": { "object": { "payment_intent": reference, "amount_refunded": amount_refunded, "currency": currency } }
    })
}

#[actix_web::test]
async fn success_events_mark_the_order_paid_and_notify() {
    let db = MemoryDatabase::new();
    let product = test_product("prod-1", dec!(25.00), true);
    db.upsert_product(product.clone()).await.unwrap();
    let order = seed_order(&db, &product, "pi_100").await;

    let mut channel = MockChannel::new();
    channel
        .expect_send_message()
        .withf(|chat_id, text, _| *chat_id == 1000001 && text.contains("Payment Successful"))
        .times(1)
        .returning(|_, _, _| Ok(()));

    let event = intent_event("evt_1", "payment_intent.succeeded", "pi_100");
    let (status, body) =
        post_json("/api/stripe-webhook", &event, &[], configure_webhook(db.clone(), channel, new_guard())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("evt_1"));
    let stored = db.fetch_order(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Paid);
}

#[actix_web::test]
async fn duplicate_events_are_acked_without_reprocessing() {
    let db = MemoryDatabase::new();
    let product = test_product("prod-1", dec!(25.00), true);
    db.upsert_product(product.clone()).await.unwrap();
    let order = seed_order(&db, &product, "pi_100").await;

    let mut channel = MockChannel::new();
    channel.expect_send_message().times(1).returning(|_, _, _| Ok(()));

    let service =
        test::init_service(App::new().configure(configure_webhook(db.clone(), channel, new_guard()))).await;
    let event = intent_event("evt_1", "payment_intent.succeeded", "pi_100");
    let (first, _) = send(&service, TestRequest::post().uri("/api/stripe-webhook").set_json(&event)).await;
    let (second, body) = send(&service, TestRequest::post().uri("/api/stripe-webhook").set_json(&event)).await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert!(body.contains("already_processed"));
    let stored = db.fetch_order(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Paid);
}

#[actix_web::test]
async fn failed_payments_cancel_the_order() {
    let db = MemoryDatabase::new();
    let product = test_product("prod-1", dec!(25.00), true);
    db.upsert_product(product.clone()).await.unwrap();
    let order = seed_order(&db, &product, "pi_100").await;

    let mut channel = MockChannel::new();
    channel
        .expect_send_message()
        .withf(|_, text, _| text.contains("Payment Failed"))
        .times(1)
        .returning(|_, _, _| Ok(()));

    let event = intent_event("evt_2", "payment_intent.payment_failed", "pi_100");
    let (status, _) =
        post_json("/api/stripe-webhook", &event, &[], configure_webhook(db.clone(), channel, new_guard())).await;
    assert_eq!(status, StatusCode::OK);
    let stored = db.fetch_order(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Cancelled);
}

#[actix_web::test]
async fn refunds_move_paid_orders_to_refunded() {
    let db = MemoryDatabase::new();
    let product = test_product("prod-1", dec!(25.00), true);
    db.upsert_product(product.clone()).await.unwrap();
    let order = seed_order(&db, &product, "pi_100").await;
    db.checked_update_status(&order.id, OrderStatus::Pending, OrderStatus::Paid).await.unwrap();

    let mut channel = MockChannel::new();
    channel
        .expect_send_message()
        .withf(|_, text, _| text.contains("Refund Processed") && text.contains("USD 25.00"))
        .times(1)
        .returning(|_, _, _| Ok(()));

    let event = refund_event("evt_3", "pi_100", 2500, "usd");
    let (status, _) =
        post_json("/api/stripe-webhook", &event, &[], configure_webhook(db.clone(), channel, new_guard())).await;
    assert_eq!(status, StatusCode::OK);
    let stored = db.fetch_order(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Refunded);
}

#[actix_web::test]
async fn unhandled_event_types_are_acked() {
    let db = MemoryDatabase::new();
    let channel = MockChannel::new();
    let event = json!({ "id": "evt_4", "type": "customer.created", "data": { "object": {} } });
    let (status, body) =
        post_json("/api/stripe-webhook", &event, &[], configure_webhook(db, channel, new_guard())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("true"));
}

#[actix_web::test]
async fn events_for_unknown_references_are_acked() {
    let db = MemoryDatabase::new();
    let channel = MockChannel::new();
    let event = intent_event("evt_5", "payment_intent.succeeded", "pi_ghost");
    let (status, _) = post_json("/api/stripe-webhook", &event, &[], configure_webhook(db, channel, new_guard())).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn stale_events_do_not_notify() {
    let db = MemoryDatabase::new();
    let product = test_product("prod-1", dec!(25.00), true);
    db.upsert_product(product.clone()).await.unwrap();
    let order = seed_order(&db, &product, "pi_100").await;
    db.checked_update_status(&order.id, OrderStatus::Pending, OrderStatus::Paid).await.unwrap();

    // The order is already paid; a distinct success event id slips past the dedup guard but must no-op
    let channel = MockChannel::new();
    let event = intent_event("evt_6", "payment_intent.succeeded", "pi_100");
    let (status, _) =
        post_json("/api/stripe-webhook", &event, &[], configure_webhook(db.clone(), channel, new_guard())).await;
    assert_eq!(status, StatusCode::OK);
    let stored = db.fetch_order(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Paid);
}

//-------------------------------------------  Signature checks  -------------------------------------------------------

const WEBHOOK_SECRET: &str = "whsec_endpoint_test";

fn configure_signed_webhook(
    db: MemoryDatabase,
    channel: MockChannel,
    guard: Data<PaymentEventGuard>,
) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(Data::new(OrderLedgerApi::new(db.clone())))
            .app_data(Data::new(StorefrontApi::new(db.clone())))
            .app_data(Data::new(Notifier::new(channel)))
            .app_data(guard)
            .service(
                web::resource("/api/stripe-webhook")
                    .wrap(SignatureMiddlewareFactory::new(
                        STRIPE_SIGNATURE_HEADER,
                        Secret::new(WEBHOOK_SECRET.to_string()),
                        true,
                    ))
                    .route(web::post().to(stripe_webhook::<MemoryDatabase, MockChannel>)),
            );
    }
}

#[actix_web::test]
async fn correctly_signed_events_are_accepted() {
    let db = MemoryDatabase::new();
    let channel = MockChannel::new();
    let body = json!({ "id": "evt_7", "type": "customer.created", "data": { "object": {} } }).to_string();
    let signature = calculate_signature(WEBHOOK_SECRET, 1700000000, body.as_bytes());
    let header = format!("t=1700000000,v1={signature}");
    let (status, _) = post_raw(
        "/api/stripe-webhook",
        body,
        &[(STRIPE_SIGNATURE_HEADER, header.as_str())],
        configure_signed_webhook(db, channel, new_guard()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn badly_signed_events_are_rejected() {
    let db = MemoryDatabase::new();
    let channel = MockChannel::new();
    let body = json!({ "id": "evt_8", "type": "customer.created", "data": { "object": {} } }).to_string();
    let header = "t=1700000000,v1=deadbeef";
    let (status, _) = post_raw(
        "/api/stripe-webhook",
        body,
        &[(STRIPE_SIGNATURE_HEADER, header)],
        configure_signed_webhook(db, channel, new_guard()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unsigned_events_are_rejected() {
    let db = MemoryDatabase::new();
    let channel = MockChannel::new();
    let body = json!({ "id": "evt_9", "type": "customer.created", "data": { "object": {} } }).to_string();
    let (status, _) =
        post_raw("/api/stripe-webhook", body, &[], configure_signed_webhook(db, channel, new_guard())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
