use super::PaymentGatewayError;
use crate::db_types::{DraftOrder, NewDraftOrder, OrderLinkage, TransactionId, TransactionStatus};

/// The `DraftOrderManagement` trait defines behaviour for creating and querying draft orders.
///
/// A draft order is created when the storefront starts a hosted payment page checkout, and lives for as long as
/// the ArkPay transaction it mirrors. The [`PaymentGatewayDatabase`](super::PaymentGatewayDatabase) trait
/// handles the transactional state changes driven by processor events; `DraftOrderManagement` provides the
/// simpler create/query/update operations used by the checkout flows.
#[allow(async_fn_in_trait)]
pub trait DraftOrderManagement {
    /// Saves a new draft order. If a draft already exists for the transaction id, the error
    /// [`PaymentGatewayError::DraftAlreadyExists`] is returned; callers on the checkout path treat that as a
    /// resume rather than a failure.
    async fn insert_draft_order(&self, draft: NewDraftOrder) -> Result<DraftOrder, PaymentGatewayError>;

    /// Fetches the draft order for the given processor transaction id, if one exists.
    async fn fetch_draft_order_by_transaction_id(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<DraftOrder>, PaymentGatewayError>;

    /// Returns the stored redirect URL of a draft that can still be resumed for the given cart identifier, i.e.
    /// one whose transaction has not started processing yet. `None` means the checkout must create a fresh
    /// transaction.
    async fn active_draft_redirect(&self, cart_identifier: &str) -> Result<Option<String>, PaymentGatewayError>;

    /// Sets the transaction status of a draft order, optionally writing the store order linkage at the same
    /// time. The linkage fields are only ever written together. Returns the updated row, or
    /// [`PaymentGatewayError::DraftNotFound`] if the transaction id is unknown.
    async fn update_draft_status(
        &self,
        transaction_id: &TransactionId,
        status: TransactionStatus,
        linkage: Option<OrderLinkage>,
    ) -> Result<DraftOrder, PaymentGatewayError>;
}
