use thiserror::Error;

use crate::{db_types::OrderId, traits::StorageError};

#[derive(Debug, Error)]
pub enum OrderLedgerError {
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Storage error. {0}")]
    StorageError(#[from] StorageError),
}
