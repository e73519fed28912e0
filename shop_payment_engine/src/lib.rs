//! # Shop payment engine
//!
//! The transport-free core of the Telegram shop payment gateway. It is responsible for:
//! * Driving orders through the `pending → paid / cancelled → refunded` state machine ([`order_ledger`]).
//! * Creating and re-using provider-side payment intents for orders ([`intents`]).
//! * Suppressing redelivered webhook events and bot updates ([`idempotency`]).
//!
//! All persistence goes through the [`traits::ShopDatabase`] trait; [`MemoryDatabase`] is the bundled
//! single-instance backend. The payment provider sits behind [`traits::PaymentProvider`], so the engine never
//! speaks HTTP itself.

pub mod db_types;
pub mod idempotency;
pub mod intents;
pub mod memory;
pub mod order_ledger;
pub mod storefront;
pub mod traits;

pub use intents::PaymentIntentApi;
pub use memory::MemoryDatabase;
pub use order_ledger::OrderLedgerApi;
pub use storefront::StorefrontApi;
