//! The order ledger owns order status. Every status change in the system funnels through
//! [`OrderLedgerApi::transition`], which applies the lifecycle table as a single compare-and-set.

mod api;
mod errors;

pub use api::{OrderLedgerApi, TransitionOutcome};
pub use errors::OrderLedgerError;
