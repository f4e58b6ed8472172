use thiserror::Error;

use super::{
    data_objects::{DraftTransition, MaterializedOrder, OrderAnnotation},
    DraftOrderManagement,
    OrderManagement,
};
use crate::db_types::{DraftOrder, OrderStatus, StoreOrder, TransactionEvent, TransactionId, TransactionStatus};

/// The highest level of behaviour a database backend must expose to support the payment engine.
///
/// The methods on this trait are the reconciler's building blocks. Each one runs in a **single database
/// transaction** whose linchpin is a conditional update on the draft order's `transaction_status`: the loser of
/// a concurrent race for the same transition matches zero rows, rolls its side effects back, and reports `None`.
/// That is what makes webhook processing idempotent under re-delivery, out-of-order delivery, and concurrent
/// delivery.
#[allow(async_fn_in_trait)]
pub trait PaymentGatewayDatabase: Clone + DraftOrderManagement + OrderManagement {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Creates a pending store order from the given draft's cart, shipping and coupon snapshots, then moves the
    /// draft from `NOT_STARTED` to `PROCESSING` with the new order's linkage, all in one transaction.
    ///
    /// The event supplies the billing email stub and the merchant transaction id under which the attempt is
    /// recorded in the order's history. Returns `None`, with the order insert rolled back, if the draft was no
    /// longer `NOT_STARTED` by the time the update ran. Exactly one caller can win this transition.
    async fn materialize_order_from_draft(
        &self,
        draft: &DraftOrder,
        event: &TransactionEvent,
    ) -> Result<Option<MaterializedOrder>, PaymentGatewayError>;

    /// Moves a `PROCESSING` draft to `COMPLETED` and its linked order to `paid`, in one transaction.
    ///
    /// The paid transition is itself conditional, so an order can be paid at most once; if the order was
    /// already paid, the returned transition carries no order. Returns `None` if the draft was not
    /// `PROCESSING`.
    async fn settle_completed_draft(
        &self,
        draft: &DraftOrder,
        event: &TransactionEvent,
    ) -> Result<Option<DraftTransition>, PaymentGatewayError>;

    /// Marks a draft as `FAILED`. Drafts in `NOT_STARTED`, `PROCESSING` or `FAILED` accept the event; if the
    /// draft was `PROCESSING`, the linked order is marked `failed` in the same transaction. Returns `None` for
    /// drafts in a state that does not accept a failure event.
    async fn fail_draft_order(
        &self,
        draft: &DraftOrder,
        event: &TransactionEvent,
    ) -> Result<Option<DraftTransition>, PaymentGatewayError>;

    /// Marks a draft as `CANCELLED`. A `NOT_STARTED` draft is cancelled on its own; a `PROCESSING` draft also
    /// cancels its linked order. Completed, failed and already-cancelled drafts ignore the event and `None` is
    /// returned.
    async fn cancel_draft_order(
        &self,
        draft: &DraftOrder,
        event: &TransactionEvent,
    ) -> Result<Option<DraftTransition>, PaymentGatewayError>;

    /// Applies a status event to a store order that was resolved directly by its order key: updates (or starts)
    /// the order's attempt history and, when `new_status` is given, conditionally transitions the order.
    ///
    /// A `paid` order is never demoted, and no status is applied twice; in either case the history is still
    /// annotated and the untouched order is returned.
    async fn annotate_order_status(
        &self,
        order: &StoreOrder,
        event: &TransactionEvent,
        status: TransactionStatus,
        new_status: Option<OrderStatus>,
    ) -> Result<OrderAnnotation, PaymentGatewayError>;
}

#[derive(Debug, Clone, Error)]
pub enum PaymentGatewayError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("Cannot insert draft order, since one already exists for transaction {0}")]
    DraftAlreadyExists(TransactionId),
    #[error("No draft order exists for transaction {0}")]
    DraftNotFound(TransactionId),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(String),
    #[error("A stored snapshot could not be deserialized: {0}")]
    SnapshotError(String),
}

impl From<sqlx::Error> for PaymentGatewayError {
    fn from(e: sqlx::Error) -> Self {
        PaymentGatewayError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for PaymentGatewayError {
    fn from(e: serde_json::Error) -> Self {
        PaymentGatewayError::SnapshotError(e.to_string())
    }
}
