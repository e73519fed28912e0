//! The bundled single-instance repository.
//!
//! Persistence mechanics are outside the engine's scope, so this backend keeps everything in process memory
//! behind one mutex. Per-order atomicity (the compare-and-set status update and the write-once payment
//! reference) falls out of holding the lock for the whole operation.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::Utc;

use crate::{
    db_types::{InteractionLogEntry, NewInteraction, NewOrder, Order, OrderId, OrderStatus, Product},
    traits::{ShopDatabase, StorageError},
};

#[derive(Default)]
struct Inner {
    products: HashMap<String, Product>,
    orders: HashMap<OrderId, Order>,
    // payment reference -> order id
    reference_index: HashMap<String, OrderId>,
    interactions: Vec<InteractionLogEntry>,
}

#[derive(Clone, Default)]
pub struct MemoryDatabase {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// The number of audit log entries written so far. Exposed for tests and diagnostics; the core never reads
    /// the log back.
    pub fn interaction_count(&self) -> usize {
        self.lock().interactions.len()
    }
}

impl ShopDatabase for MemoryDatabase {
    async fn fetch_product(&self, id: &str) -> Result<Option<Product>, StorageError> {
        Ok(self.lock().products.get(id).cloned())
    }

    async fn fetch_active_products(&self) -> Result<Vec<Product>, StorageError> {
        let mut products: Vec<Product> = self.lock().products.values().filter(|p| p.active).cloned().collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }

    async fn upsert_product(&self, product: Product) -> Result<(), StorageError> {
        self.lock().products.insert(product.id.clone(), product);
        Ok(())
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, StorageError> {
        let now = Utc::now();
        let record = Order {
            id: OrderId::random(),
            buyer_id: order.buyer_id,
            buyer_username: order.buyer_username,
            product_id: order.product_id,
            quantity: order.quantity,
            total_amount: order.total_amount,
            currency: order.currency,
            status: OrderStatus::Pending,
            payment_reference: None,
            created_at: now,
            updated_at: now,
        };
        self.lock().orders.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, StorageError> {
        Ok(self.lock().orders.get(id).cloned())
    }

    async fn fetch_order_by_payment_reference(&self, reference: &str) -> Result<Option<Order>, StorageError> {
        let inner = self.lock();
        Ok(inner.reference_index.get(reference).and_then(|id| inner.orders.get(id)).cloned())
    }

    async fn fetch_orders_for_buyer(&self, buyer_id: &str) -> Result<Vec<Order>, StorageError> {
        let mut orders: Vec<Order> =
            self.lock().orders.values().filter(|o| o.buyer_id == buyer_id).cloned().collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn checked_update_status(
        &self,
        id: &OrderId,
        expected: OrderStatus,
        new: OrderStatus,
    ) -> Result<(Order, bool), StorageError> {
        let mut inner = self.lock();
        let order = inner.orders.get_mut(id).ok_or_else(|| StorageError::NotFound(format!("order {id}")))?;
        if order.status == expected {
            order.status = new;
            order.updated_at = Utc::now();
            Ok((order.clone(), true))
        } else {
            Ok((order.clone(), false))
        }
    }

    async fn attach_payment_reference(&self, id: &OrderId, reference: &str) -> Result<Order, StorageError> {
        let mut inner = self.lock();
        let order = inner.orders.get_mut(id).ok_or_else(|| StorageError::NotFound(format!("order {id}")))?;
        if order.payment_reference.is_some() {
            return Err(StorageError::PaymentReferenceAlreadySet(id.clone()));
        }
        order.payment_reference = Some(reference.to_string());
        order.updated_at = Utc::now();
        let order = order.clone();
        inner.reference_index.insert(reference.to_string(), id.clone());
        Ok(order)
    }

    async fn log_interaction(&self, entry: NewInteraction) -> Result<(), StorageError> {
        let mut inner = self.lock();
        let id = inner.interactions.len() as i64 + 1;
        inner.interactions.push(InteractionLogEntry {
            id,
            buyer_id: entry.buyer_id,
            buyer_username: entry.buyer_username,
            kind: entry.kind,
            content: entry.content,
            response: entry.response,
            created_at: Utc::now(),
        });
        Ok(())
    }
}
