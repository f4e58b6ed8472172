use serde::{Deserialize, Serialize};

use crate::db_types::{OrderStatus, StoreOrder};

/// Fired when a store order actually transitions to `paid`. Emitted at most once per order; re-delivered
/// COMPLETED webhooks annotate history without firing this again.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPaidEvent {
    pub order: StoreOrder,
}

impl OrderPaidEvent {
    pub fn new(order: StoreOrder) -> Self {
        Self { order }
    }
}

/// Fired when a store order transitions to `failed` or `cancelled`. The status field records which.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAnnulledEvent {
    pub order: StoreOrder,
    pub status: OrderStatus,
}

impl OrderAnnulledEvent {
    pub fn new(order: StoreOrder) -> Self {
        let status = order.status;
        Self { order, status }
    }
}
