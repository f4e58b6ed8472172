use super::PaymentGatewayError;
use crate::db_types::{
    NewStoreOrder,
    OrderCoupon,
    OrderItem,
    OrderKey,
    StoreOrder,
    TransactionId,
    TransactionMetaEntry,
    TransactionStatus,
};

/// The `OrderManagement` trait defines the behaviour of the local store order projection.
///
/// Orders enter the projection either when the reconciler materializes one from a draft, or when the storefront
/// registers an order it created itself (the direct-card flow pays against such an order). Every payment
/// attempt against an order leaves an entry in that order's transaction history, and webhook deliveries mutate
/// the status of the most recent entry.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Saves a new store order, including its line items and coupons.
    async fn insert_order(&self, order: NewStoreOrder) -> Result<StoreOrder, PaymentGatewayError>;

    /// Fetches the order with the given order key, if it exists.
    async fn fetch_order_by_key(&self, order_key: &OrderKey) -> Result<Option<StoreOrder>, PaymentGatewayError>;

    /// Fetches the order with the given internal id, if it exists.
    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<StoreOrder>, PaymentGatewayError>;

    /// Fetches the line items of an order.
    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, PaymentGatewayError>;

    /// Fetches the coupons applied to an order.
    async fn fetch_order_coupons(&self, order_id: i64) -> Result<Vec<OrderCoupon>, PaymentGatewayError>;

    /// Appends a payment attempt to an order's transaction history. `meta_key` is the merchant transaction id
    /// exactly as it was sent to the processor. Returns [`PaymentGatewayError::OrderNotFound`] if the order does
    /// not exist.
    async fn append_transaction_attempt(
        &self,
        order_id: i64,
        meta_key: &str,
        transaction_id: &TransactionId,
        status: TransactionStatus,
    ) -> Result<TransactionMetaEntry, PaymentGatewayError>;

    /// Fetches the full transaction history for an order, oldest first.
    async fn transaction_history(&self, order_id: i64) -> Result<Vec<TransactionMetaEntry>, PaymentGatewayError>;
}
