use thiserror::Error;

use crate::db_types::{NewInteraction, NewOrder, Order, OrderId, OrderStatus, Product};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("The requested record was not found. {0}")]
    NotFound(String),
    #[error("The payment reference for order {0} has already been set")]
    PaymentReferenceAlreadySet(OrderId),
    #[error("Internal storage error. {0}")]
    Internal(String),
}

/// The repository contract for the shop gateway.
///
/// Implementations must make [`checked_update_status`](ShopDatabase::checked_update_status) and
/// [`attach_payment_reference`](ShopDatabase::attach_payment_reference) atomic per order; those two calls are the
/// only mutations the concurrent ingestion gates race on.
#[allow(async_fn_in_trait)]
pub trait ShopDatabase: Clone {
    async fn fetch_product(&self, id: &str) -> Result<Option<Product>, StorageError>;

    /// All products currently offered for sale, newest first.
    async fn fetch_active_products(&self) -> Result<Vec<Product>, StorageError>;

    /// Create or replace a product record. The catalog is managed by an external collaborator; this exists so
    /// deployments and tests can seed the repository.
    async fn upsert_product(&self, product: Product) -> Result<(), StorageError>;

    /// Store a new `pending` order, assigning it a fresh id and timestamps.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StorageError>;

    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, StorageError>;

    /// The order currently bound to the given provider-side payment reference, if any.
    async fn fetch_order_by_payment_reference(&self, reference: &str) -> Result<Option<Order>, StorageError>;

    /// All orders placed by the given buyer, newest first.
    async fn fetch_orders_for_buyer(&self, buyer_id: &str) -> Result<Vec<Order>, StorageError>;

    /// Atomically set the order status to `new` if and only if the current status equals `expected`
    /// (compare-and-set). Returns the order as it stands after the call, along with whether the update was
    /// applied. A `false` flag means another event won the race; the returned order carries the winning status.
    async fn checked_update_status(
        &self,
        id: &OrderId,
        expected: OrderStatus,
        new: OrderStatus,
    ) -> Result<(Order, bool), StorageError>;

    /// Bind a provider payment reference to the order. The reference is immutable once set; a second call for
    /// the same order fails with [`StorageError::PaymentReferenceAlreadySet`].
    async fn attach_payment_reference(&self, id: &OrderId, reference: &str) -> Result<Order, StorageError>;

    /// Append an entry to the interaction audit log.
    async fn log_interaction(&self, entry: NewInteraction) -> Result<(), StorageError>;
}
