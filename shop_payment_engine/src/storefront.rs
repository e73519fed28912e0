use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewInteraction, Order, OrderId, Product},
    traits::{ShopDatabase, StorageError},
};

/// Read-side API over the catalog and order book, plus the write-only interaction audit log. Used by the bot
/// gate for its catalog/order queries and by both gates for audit logging.
pub struct StorefrontApi<B> {
    db: B,
}

impl<B> Debug for StorefrontApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StorefrontApi")
    }
}

impl<B> StorefrontApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> StorefrontApi<B>
where B: ShopDatabase
{
    pub async fn product(&self, id: &str) -> Result<Option<Product>, StorageError> {
        self.db.fetch_product(id).await
    }

    pub async fn active_products(&self) -> Result<Vec<Product>, StorageError> {
        self.db.fetch_active_products().await
    }

    pub async fn order(&self, id: &OrderId) -> Result<Option<Order>, StorageError> {
        self.db.fetch_order(id).await
    }

    pub async fn orders_for_buyer(&self, buyer_id: &str) -> Result<Vec<Order>, StorageError> {
        self.db.fetch_orders_for_buyer(buyer_id).await
    }

    /// Append to the audit log. The log is a best-effort side channel, so failures are logged and swallowed
    /// rather than propagated into the event-processing path.
    pub async fn log_interaction(&self, entry: NewInteraction) {
        if let Err(e) = self.db.log_interaction(entry).await {
            warn!("🛒️ Could not write interaction log entry. {e}");
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
