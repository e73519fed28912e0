use rust_decimal::Decimal;
use thiserror::Error;
use tsg_common::{MinorUnits, MoneyConversionError};

use crate::{db_types::OrderId, traits::{ProviderError, StorageError}};

#[derive(Debug, Error)]
pub enum PaymentIntentError {
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {0} is not in a payable state")]
    OrderNotPayable(OrderId),
    #[error("Product {0} does not exist")]
    ProductNotFound(String),
    #[error("Product {0} is not available for purchase")]
    ProductInactive(String),
    #[error("The price ({0}) is below the provider's minimum chargeable amount ({1})")]
    PriceTooLow(Decimal, MinorUnits),
    #[error("Could not convert the order amount to minor units. {0}")]
    AmountConversion(#[from] MoneyConversionError),
    #[error("Payment provider error. {0}")]
    ProviderError(#[from] ProviderError),
    #[error("Storage error. {0}")]
    StorageError(#[from] StorageError),
}
