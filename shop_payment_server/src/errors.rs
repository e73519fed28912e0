use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use shop_payment_engine::{
    intents::PaymentIntentError,
    order_ledger::OrderLedgerError,
    traits::{ProviderError, StorageError},
};
use thiserror::Error;

use crate::notifier::ChannelError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Payload deserialization error")]
    CouldNotDeserializePayload,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The payment cannot be taken. {0}")]
    PaymentNotPossible(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::CouldNotDeserializePayload => StatusCode::BAD_REQUEST,
            Self::PaymentNotPossible(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingSignature => StatusCode::BAD_REQUEST,
                AuthError::InvalidSignature => StatusCode::BAD_REQUEST,
                AuthError::InvalidSecretToken => StatusCode::UNAUTHORIZED,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No webhook signature found in the request.")]
    MissingSignature,
    #[error("The webhook signature is invalid.")]
    InvalidSignature,
    #[error("The webhook secret token is missing or does not match.")]
    InvalidSecretToken,
}

impl From<PaymentIntentError> for ServerError {
    fn from(e: PaymentIntentError) -> Self {
        match e {
            PaymentIntentError::OrderNotFound(_) | PaymentIntentError::ProductNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            PaymentIntentError::OrderNotPayable(_) |
            PaymentIntentError::ProductInactive(_) |
            PaymentIntentError::PriceTooLow(_, _) |
            PaymentIntentError::AmountConversion(_) => Self::PaymentNotPossible(e.to_string()),
            PaymentIntentError::ProviderError(e) => Self::BackendError(e.to_string()),
            PaymentIntentError::StorageError(e) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<OrderLedgerError> for ServerError {
    fn from(e: OrderLedgerError) -> Self {
        match e {
            OrderLedgerError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            OrderLedgerError::StorageError(e) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<StorageError> for ServerError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(_) => Self::NoRecordFound(e.to_string()),
            e => Self::BackendError(e.to_string()),
        }
    }
}

impl From<ProviderError> for ServerError {
    fn from(e: ProviderError) -> Self {
        Self::BackendError(e.to_string())
    }
}

impl From<ChannelError> for ServerError {
    fn from(e: ChannelError) -> Self {
        Self::BackendError(e.to_string())
    }
}
