use actix_web::{
    body::{to_bytes, MessageBody},
    dev::{Service, ServiceResponse},
    http::StatusCode,
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
    Error,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use shop_payment_engine::{
    db_types::{NewOrder, Order, Product},
    memory::MemoryDatabase,
    traits::ShopDatabase,
};

pub fn test_product(id: &str, price: Decimal, active: bool) -> Product {
    Product {
        id: id.to_string(),
        name: format!("Product {id}"),
        description: "A test product".into(),
        price,
        currency: "USD".into(),
        image_url: None,
        active,
        created_at: Utc::now(),
    }
}

/// Seed a pending order for the buyer with chat id 1000001, bound to the given payment reference.
pub async fn seed_order(db: &MemoryDatabase, product: &Product, reference: &str) -> Order {
    let order = db
        .insert_order(NewOrder {
            buyer_id: "1000001".into(),
            buyer_username: Some("alice".into()),
            product_id: product.id.clone(),
            quantity: 1,
            total_amount: product.price,
            currency: product.currency.clone(),
        })
        .await
        .unwrap();
    db.attach_payment_reference(&order.id, reference).await.unwrap()
}

pub async fn get_request<F: FnOnce(&mut ServiceConfig)>(path: &str, configure: F) -> (StatusCode, String) {
    let service = test::init_service(App::new().configure(configure)).await;
    send(&service, TestRequest::get().uri(path)).await
}

pub async fn post_json<B: Serialize, F: FnOnce(&mut ServiceConfig)>(
    path: &str,
    body: &B,
    headers: &[(&str, &str)],
    configure: F,
) -> (StatusCode, String) {
    let service = test::init_service(App::new().configure(configure)).await;
    let mut req = TestRequest::post().uri(path).set_json(body);
    for (name, value) in headers {
        req = req.insert_header((name.to_string(), value.to_string()));
    }
    send(&service, req).await
}

/// Post an exact raw body. Signature checks are computed over the raw bytes, so the body must not be
/// re-serialized on the way in.
pub async fn post_raw<F: FnOnce(&mut ServiceConfig)>(
    path: &str,
    body: String,
    headers: &[(&str, &str)],
    configure: F,
) -> (StatusCode, String) {
    let service = test::init_service(App::new().configure(configure)).await;
    let mut req = TestRequest::post()
        .uri(path)
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body);
    for (name, value) in headers {
        req = req.insert_header((name.to_string(), value.to_string()));
    }
    send(&service, req).await
}

/// Issue the request and normalize both success and error paths into (status, body). Handler errors surface
/// as `Err` from the service, carrying the status their `ResponseError` impl renders.
pub async fn send<S, B>(service: &S, req: TestRequest) -> (StatusCode, String)
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    match test::try_call_service(service, req.to_request()).await {
        Ok(res) => {
            let (_, res) = res.into_parts();
            let status = res.status();
            let bytes = res.into_body().try_into_bytes().map_err(|_| ()).unwrap_or_default();
            let body = String::from_utf8_lossy(&bytes).into_owned();
            (status, body)
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = to_bytes(res.into_body()).await.map(|b| String::from_utf8_lossy(&b).into_owned());
            (status, body.unwrap_or_default())
        },
    }
}
