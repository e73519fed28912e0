//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```

use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use shop_payment_engine::{
    db_types::OrderId,
    traits::{PaymentProvider, ShopDatabase},
    PaymentIntentApi,
    StorefrontApi,
};

use crate::{
    data_objects::{CheckoutIntentResult, PaymentIntentRequest, PaymentIntentResult, PublicOrder},
    errors::ServerError,
};

// Re-exported so route! invocations in other modules resolve the handler bounds unqualified.
pub use crate::{notifier::NotificationChannel, telegram::telegram_webhook};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
                impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name);
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//--------------------------------------   Create payment intent  -----------------------------------------------
route!(create_payment_intent => Post "/create-payment-intent" impl ShopDatabase, PaymentProvider);
/// Route handler for the bot frontend's purchase call.
///
/// Creates a `pending` order for the product and a payment intent to pay for it. The product must exist, be
/// active, and cost at least the provider's minimum chargeable amount; nothing is stored when any of those
/// checks fail.
pub async fn create_payment_intent<B, P>(
    body: web::Json<PaymentIntentRequest>,
    api: web::Data<PaymentIntentApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: ShopDatabase,
    P: PaymentProvider,
{
    trace!("💻️ Received create payment intent request");
    let request = body.into_inner();
    let checkout =
        api.create_order_and_intent(&request.product_id, &request.telegram_user_id, request.telegram_username).await?;
    debug!("💻️ Issued payment intent {} for order {}", checkout.intent.reference, checkout.order.id);
    Ok(HttpResponse::Ok().json(PaymentIntentResult {
        client_secret: checkout.intent.client_secret,
        order_id: checkout.order.id,
        product_name: checkout.product.name,
        amount: checkout.order.total_amount,
        currency: checkout.order.currency,
    }))
}

//--------------------------------------   Order payment intent  ------------------------------------------------
route!(order_payment_intent => Post "/orders/{id}/payment-intent" impl ShopDatabase, PaymentProvider);
/// Route handler for the checkout page.
///
/// Returns the payment intent for an existing `pending` order, creating one on first call and returning the
/// same one on every call after that.
pub async fn order_payment_intent<B, P>(
    path: web::Path<String>,
    api: web::Data<PaymentIntentApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: ShopDatabase,
    P: PaymentProvider,
{
    let order_id = OrderId(path.into_inner());
    trace!("💻️ Received payment intent request for order {order_id}");
    let checkout = api.create_or_get_intent(&order_id).await?;
    Ok(HttpResponse::Ok()
        .json(CheckoutIntentResult { client_secret: checkout.intent.client_secret, order_id: checkout.order.id }))
}

//--------------------------------------       Order by id       ------------------------------------------------
route!(order_by_id => Get "/orders/{id}" impl ShopDatabase);
/// Public, sanitized view of an order for the checkout page. Buyer identifiers and the payment reference are
/// stripped from the response.
pub async fn order_by_id<B>(
    path: web::Path<String>,
    storefront: web::Data<StorefrontApi<B>>,
) -> Result<HttpResponse, ServerError>
where B: ShopDatabase
{
    let order_id = OrderId(path.into_inner());
    trace!("💻️ Received order lookup for {order_id}");
    let order = storefront
        .order(&order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id}")))?;
    let product = storefront
        .product(&order.product_id)
        .await?
        .ok_or_else(|| ServerError::BackendError(format!("Order {order_id} refers to unknown product")))?;
    Ok(HttpResponse::Ok().json(PublicOrder::from_parts(order, product)))
}

//--------------------------------------    Telegram webhook     ------------------------------------------------
route!(telegram_webhook => Post "/telegram-webhook" impl ShopDatabase, PaymentProvider, NotificationChannel);
