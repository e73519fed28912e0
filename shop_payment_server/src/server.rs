use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use shop_payment_engine::{
    idempotency::{InMemoryEventStore, ProcessedEventStore},
    memory::MemoryDatabase,
    traits::{PaymentProvider, ShopDatabase},
    OrderLedgerApi,
    PaymentIntentApi,
    StorefrontApi,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::{StripeApi, TelegramApi},
    middleware::SignatureMiddlewareFactory,
    notifier::{NotificationChannel, Notifier},
    routes::{health, CreatePaymentIntentRoute, OrderByIdRoute, OrderPaymentIntentRoute, TelegramWebhookRoute},
    stripe_webhook::{stripe_webhook, PaymentEventGuard, STRIPE_SIGNATURE_HEADER},
    telegram::{BotOptions, BotUpdateGuard},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = MemoryDatabase::new();
    let provider = StripeApi::new(&config.stripe)?;
    let channel = TelegramApi::new(&config.telegram)?;
    let srv = create_server_instance(config, db, provider, channel)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Assemble the HTTP server. Must be called from within a tokio runtime (the guard sweepers are spawned here).
pub fn create_server_instance<B, P, C>(
    config: ServerConfig,
    db: B,
    provider: P,
    channel: C,
) -> Result<Server, ServerError>
where
    B: ShopDatabase + Send + Sync + 'static,
    P: PaymentProvider + Clone + Send + Sync + 'static,
    C: NotificationChannel + Clone + Send + Sync + 'static,
{
    // The guards are created once and shared across all workers, otherwise each worker would admit its own
    // first sighting of the same event.
    let payment_guard = PaymentEventGuard(Arc::new(InMemoryEventStore::new(config.event_retention)));
    let update_guard = BotUpdateGuard(Arc::new(InMemoryEventStore::new(config.event_retention)));
    start_sweeper(Arc::clone(&payment_guard.0), config.event_retention);
    start_sweeper(Arc::clone(&update_guard.0), config.event_retention);
    let bot_options =
        BotOptions { app_url: config.app_url.clone(), secret_token: config.telegram.webhook_secret.clone() };
    let webhook_secret = config.stripe.webhook_secret.clone();
    let signature_checks = config.stripe.signature_checks;
    let srv = HttpServer::new(move || {
        let ledger = OrderLedgerApi::new(db.clone());
        let intents = PaymentIntentApi::new(db.clone(), provider.clone());
        let storefront = StorefrontApi::new(db.clone());
        let notifier = Notifier::new(channel.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("tsg::access_log"))
            .app_data(web::Data::new(ledger))
            .app_data(web::Data::new(intents))
            .app_data(web::Data::new(storefront))
            .app_data(web::Data::new(notifier))
            .app_data(web::Data::new(payment_guard.clone()))
            .app_data(web::Data::new(update_guard.clone()))
            .app_data(web::Data::new(bot_options.clone()));
        // The Stripe signature is verified over the raw request body, so this resource is wired up manually
        // with the signature middleware instead of going through the /api scope.
        let stripe_hook = web::resource("/api/stripe-webhook")
            .wrap(SignatureMiddlewareFactory::new(STRIPE_SIGNATURE_HEADER, webhook_secret.clone(), signature_checks))
            .route(web::post().to(stripe_webhook::<B, C>));
        let api_scope = web::scope("/api")
            .service(TelegramWebhookRoute::<B, P, C>::new())
            .service(CreatePaymentIntentRoute::<B, P>::new())
            .service(OrderPaymentIntentRoute::<B, P>::new())
            .service(OrderByIdRoute::<B>::new());
        app.service(health).service(stripe_hook).service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    info!("🚀️ Webhook signature checks are {}", if signature_checks { "enabled" } else { "DISABLED" });
    Ok(srv)
}

fn start_sweeper(store: Arc<dyn ProcessedEventStore>, retention: Duration) {
    // Sweep at the retention interval, but never more often than once a minute
    let period = retention.max(Duration::from_secs(60));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            interval.tick().await;
            store.sweep();
        }
    });
}
