//! # Shop payment server
//! This crate hosts the HTTP surface of the shop gateway. It is responsible for:
//! Listening for incoming payment webhook events from Stripe and verifying their signatures.
//! Listening for incoming bot updates from Telegram and dispatching commands and callbacks.
//! Exposing the checkout endpoints that create and look up payment intents.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/stripe-webhook`: The signed webhook route for receiving payment events from Stripe.
//! * `/api/telegram-webhook`: The webhook route for receiving bot updates from Telegram.
//! * `/api/create-payment-intent`: Creates an order and a payment intent for a product.
//! * `/api/orders/{id}`: A sanitized public view of an order, for the checkout page.
//! * `/api/orders/{id}/payment-intent`: Creates (or returns) the payment intent for an existing order.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;

pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod notifier;
pub mod routes;
pub mod server;
pub mod stripe_webhook;
pub mod telegram;
