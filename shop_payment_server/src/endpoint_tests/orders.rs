use actix_web::{http::StatusCode, web, web::Data, web::ServiceConfig};
use rust_decimal_macros::dec;
use serde_json::json;
use shop_payment_engine::{
    db_types::OrderStatus,
    memory::MemoryDatabase,
    traits::{PaymentIntent, ShopDatabase},
    PaymentIntentApi,
    StorefrontApi,
};
use tsg_common::MinorUnits;

use crate::{
    endpoint_tests::{
        helpers::{get_request, post_json, seed_order, test_product},
        mocks::MockProvider,
    },
    routes::{health, CreatePaymentIntentRoute, OrderByIdRoute, OrderPaymentIntentRoute},
};

fn configure_api(db: MemoryDatabase, provider: MockProvider) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(Data::new(PaymentIntentApi::new(db.clone(), provider)))
            .app_data(Data::new(StorefrontApi::new(db)))
            .service(health)
            .service(
                web::scope("/api")
                    .service(CreatePaymentIntentRoute::<MemoryDatabase, MockProvider>::new())
                    .service(OrderPaymentIntentRoute::<MemoryDatabase, MockProvider>::new())
                    .service(OrderByIdRoute::<MemoryDatabase>::new()),
            );
    }
}

fn stock_provider() -> MockProvider {
    let mut provider = MockProvider::new();
    provider.expect_minimum_charge().returning(|_| MinorUnits::from(50));
    provider.expect_create_intent().returning(|req| {
        Ok(PaymentIntent {
            reference: format!("pi_{}", req.metadata.order_id.as_str()),
            client_secret: "cs_test_123".into(),
        })
    });
    provider
}

#[actix_web::test]
async fn health_check_responds() {
    let (status, body) = get_request("/health", configure_api(MemoryDatabase::new(), MockProvider::new())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn create_payment_intent_returns_the_client_secret() {
    let db = MemoryDatabase::new();
    db.upsert_product(test_product("prod-1", dec!(25.00), true)).await.unwrap();
    let body = json!({ "productId": "prod-1", "telegramUserId": "1000001", "telegramUsername": "alice" });
    let (status, response) =
        post_json("/api/create-payment-intent", &body, &[], configure_api(db.clone(), stock_provider())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(response.contains("cs_test_123"));
    assert!(response.contains("Product prod-1"));
    assert!(response.contains("orderId"));
    let orders = db.fetch_orders_for_buyer("1000001").await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatus::Pending);
}

#[actix_web::test]
async fn create_payment_intent_for_unknown_products_is_a_404() {
    let db = MemoryDatabase::new();
    let body = json!({ "productId": "prod-404", "telegramUserId": "1000001", "telegramUsername": null });
    let (status, _) =
        post_json("/api/create-payment-intent", &body, &[], configure_api(db, MockProvider::new())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn create_payment_intent_for_inactive_products_is_rejected() {
    let db = MemoryDatabase::new();
    db.upsert_product(test_product("prod-1", dec!(25.00), false)).await.unwrap();
    let body = json!({ "productId": "prod-1", "telegramUserId": "1000001", "telegramUsername": null });
    let (status, _) =
        post_json("/api/create-payment-intent", &body, &[], configure_api(db.clone(), MockProvider::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(db.fetch_orders_for_buyer("1000001").await.unwrap().is_empty());
}

#[actix_web::test]
async fn prices_below_the_charge_floor_are_rejected_without_an_order() {
    let db = MemoryDatabase::new();
    db.upsert_product(test_product("prod-cheap", dec!(0.25), true)).await.unwrap();
    let mut provider = MockProvider::new();
    provider.expect_minimum_charge().returning(|_| MinorUnits::from(50));
    provider.expect_create_intent().never();
    let body = json!({ "productId": "prod-cheap", "telegramUserId": "1000001", "telegramUsername": null });
    let (status, _) = post_json("/api/create-payment-intent", &body, &[], configure_api(db.clone(), provider)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(db.fetch_orders_for_buyer("1000001").await.unwrap().is_empty());
}

#[actix_web::test]
async fn checkout_reuses_the_existing_payment_intent() {
    let db = MemoryDatabase::new();
    let product = test_product("prod-1", dec!(25.00), true);
    db.upsert_product(product.clone()).await.unwrap();
    let order = seed_order(&db, &product, "pi_100").await;
    let mut provider = MockProvider::new();
    provider.expect_create_intent().never();
    provider
        .expect_retrieve_intent()
        .withf(|reference| reference == "pi_100")
        .times(1)
        .returning(|reference| {
            Ok(PaymentIntent { reference: reference.to_string(), client_secret: "cs_existing".into() })
        });
    let path = format!("/api/orders/{}/payment-intent", order.id.as_str());
    let (status, body) = post_json(&path, &json!({}), &[], configure_api(db, provider)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("cs_existing"));
}

#[actix_web::test]
async fn checkout_of_a_non_pending_order_is_rejected() {
    let db = MemoryDatabase::new();
    let product = test_product("prod-1", dec!(25.00), true);
    db.upsert_product(product.clone()).await.unwrap();
    let order = seed_order(&db, &product, "pi_100").await;
    db.checked_update_status(&order.id, OrderStatus::Pending, OrderStatus::Paid).await.unwrap();
    let path = format!("/api/orders/{}/payment-intent", order.id.as_str());
    let (status, _) = post_json(&path, &json!({}), &[], configure_api(db, MockProvider::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn order_lookup_returns_a_sanitized_view() {
    let db = MemoryDatabase::new();
    let product = test_product("prod-1", dec!(25.00), true);
    db.upsert_product(product.clone()).await.unwrap();
    let order = seed_order(&db, &product, "pi_100").await;
    let path = format!("/api/orders/{}", order.id.as_str());
    let (status, body) = get_request(&path, configure_api(db, MockProvider::new())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(order.id.as_str()));
    assert!(body.contains("Product prod-1"));
    // The buyer's identity and the provider reference never reach the checkout page
    assert!(!body.contains("buyer"));
    assert!(!body.contains("1000001"));
    assert!(!body.contains("alice"));
    assert!(!body.contains("pi_100"));
}

#[actix_web::test]
async fn unknown_orders_are_a_404() {
    let db = MemoryDatabase::new();
    let (status, _) = get_request("/api/orders/ord-unknown", configure_api(db, MockProvider::new())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
