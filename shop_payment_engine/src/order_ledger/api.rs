use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Order, OrderId, OrderStatus},
    order_ledger::OrderLedgerError,
    traits::ShopDatabase,
};

/// The result of asking the ledger to move an order to a new status.
///
/// `Unchanged` is not an error: stale or duplicate events are expected under at-least-once delivery, and the
/// transition guard absorbs them. Callers send notifications only for `Applied` outcomes.
#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    Applied(Order),
    Unchanged(Order),
}

impl TransitionOutcome {
    pub fn order(&self) -> &Order {
        match self {
            TransitionOutcome::Applied(o) | TransitionOutcome::Unchanged(o) => o,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied(_))
    }
}

pub struct OrderLedgerApi<B> {
    db: B,
}

impl<B> Debug for OrderLedgerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderLedgerApi")
    }
}

impl<B> OrderLedgerApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OrderLedgerApi<B>
where B: ShopDatabase
{
    /// Attempt to move the order to `target`.
    ///
    /// The guard table ([`OrderStatus::can_transition_to`]) decides whether the transition is permitted for the
    /// order's current status; anything else is a logged no-op. The status write itself is a compare-and-set
    /// against the status that was just read, so two events racing for the same order cannot both apply: the
    /// loser observes the post-transition state and no-ops.
    pub async fn transition(&self, id: &OrderId, target: OrderStatus) -> Result<TransitionOutcome, OrderLedgerError> {
        let order = self.db.fetch_order(id).await?.ok_or_else(|| OrderLedgerError::OrderNotFound(id.clone()))?;
        let current = order.status;
        if !current.can_transition_to(target) {
            warn!("🔄️ Ignoring {current} → {target} for order {id}. The transition is not permitted.");
            return Ok(TransitionOutcome::Unchanged(order));
        }
        let (order, applied) = self.db.checked_update_status(id, current, target).await?;
        if applied {
            debug!("🔄️ Order {id} moved from {current} to {target}");
            Ok(TransitionOutcome::Applied(order))
        } else {
            warn!(
                "🔄️ Order {id} changed status while a {current} → {target} transition was in flight. Leaving it as {}.",
                order.status
            );
            Ok(TransitionOutcome::Unchanged(order))
        }
    }

    pub async fn order_by_id(&self, id: &OrderId) -> Result<Option<Order>, OrderLedgerError> {
        Ok(self.db.fetch_order(id).await?)
    }

    /// The order bound to the given provider payment reference, if any. Both ingestion gates use this to
    /// resolve which order an incoming provider event refers to.
    pub async fn find_by_payment_reference(&self, reference: &str) -> Result<Option<Order>, OrderLedgerError> {
        Ok(self.db.fetch_order_by_payment_reference(reference).await?)
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
